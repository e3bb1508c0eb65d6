use crate::dataset::{courses, filter_records, years_ordered, RowFilter};
use crate::frequency::{grouped_cells, FrequencyMatrix};
use crate::index::knowledge_index;
use crate::models::{
    Comparison, Factor, FrequencyCell, Outcome, Scope, SurveyRecord, Target, TestKind,
    QUESTION_COUNT,
};
use crate::stats::{self, SkipReason, SrhObservation, TestSummary};

pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Full comparison suite: global and per-question tests over grouped
/// frequency counts, plus index-level tests per scope.
pub fn compare_all(records: &[SurveyRecord]) -> Vec<Comparison> {
    let cells = grouped_cells(records);
    let mut results = global_frequency_tests(&cells);
    results.extend(per_question_frequency_tests(&cells));
    results.extend(index_tests(records));
    results
}

/// The p < 0.05 subset; insufficient slices never qualify.
pub fn significant(results: &[Comparison]) -> Vec<Comparison> {
    results
        .iter()
        .filter(|comparison| {
            matches!(
                comparison.outcome,
                Outcome::Computed {
                    significant: true,
                    ..
                }
            )
        })
        .cloned()
        .collect()
}

fn computed(summary: TestSummary) -> Outcome {
    Outcome::Computed {
        statistic: summary.statistic,
        p_value: summary.p_value,
        significant: summary.p_value < SIGNIFICANCE_LEVEL,
    }
}

fn insufficient(reason: SkipReason) -> Outcome {
    Outcome::Insufficient {
        reason: reason.describe().to_string(),
    }
}

fn outcome(result: Result<TestSummary, SkipReason>) -> Outcome {
    match result {
        Ok(summary) => computed(summary),
        Err(reason) => insufficient(reason),
    }
}

fn cell_courses(cells: &[FrequencyCell]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for cell in cells {
        if !seen.contains(&cell.course.as_str()) {
            seen.push(&cell.course);
        }
    }
    seen
}

fn cell_years(cells: &[FrequencyCell]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for cell in cells {
        if !seen.contains(&cell.year.as_str()) {
            seen.push(&cell.year);
        }
    }
    seen
}

/// Count observations grouped by a cell label; a label with no cells yields
/// an empty group, which the tests reject as insufficient.
fn counts_by<'a>(
    cells: &[FrequencyCell],
    labels: &[&'a str],
    key: impl Fn(&FrequencyCell) -> &str,
) -> Vec<Vec<f64>> {
    labels
        .iter()
        .map(|label| {
            cells
                .iter()
                .filter(|cell| key(cell) == *label)
                .map(|cell| cell.count as f64)
                .collect()
        })
        .collect()
}

/// Mann-Whitney needs exactly 2 groups; the first two (dataset order) are
/// compared, matching how the dashboard picked its course pair.
fn first_pair_mann_whitney(groups: &[Vec<f64>]) -> Outcome {
    if groups.len() < 2 {
        return insufficient(SkipReason::TooFewGroups);
    }
    outcome(stats::mann_whitney(&groups[0], &groups[1]))
}

fn srh_observations(cells: &[FrequencyCell]) -> Vec<SrhObservation> {
    cells
        .iter()
        .map(|cell| SrhObservation {
            value: cell.count as f64,
            level_a: &cell.course,
            level_b: &cell.year,
        })
        .collect()
}

/// Three table rows (course, year, interaction) for one Scheirer-Ray-Hare
/// run; a precondition failure marks all three as insufficient.
fn srh_comparisons(cells: &[FrequencyCell], target: Target) -> Vec<Comparison> {
    let rows = [
        Factor::Course,
        Factor::Year,
        Factor::CourseYearInteraction,
    ];
    match stats::scheirer_ray_hare(&srh_observations(cells)) {
        Ok(table) => {
            let summaries = [table.factor_a, table.factor_b, table.interaction];
            rows.iter()
                .zip(summaries)
                .map(|(factor, summary)| Comparison {
                    test: TestKind::ScheirerRayHare,
                    factor: *factor,
                    target,
                    outcome: computed(summary),
                })
                .collect()
        }
        Err(reason) => rows
            .iter()
            .map(|factor| Comparison {
                test: TestKind::ScheirerRayHare,
                factor: *factor,
                target,
                outcome: insufficient(reason),
            })
            .collect(),
    }
}

/// Whole-table tests over the grouped frequency counts: Kruskal-Wallis by
/// course and by year, then Scheirer-Ray-Hare on course x year.
pub fn global_frequency_tests(cells: &[FrequencyCell]) -> Vec<Comparison> {
    let course_labels = cell_courses(cells);
    let year_labels = cell_years(cells);
    let mut results = Vec::new();

    let course_groups = counts_by(cells, &course_labels, |cell| &cell.course);
    results.push(Comparison {
        test: TestKind::KruskalWallis,
        factor: Factor::Course,
        target: Target::AllQuestions,
        outcome: outcome(stats::kruskal_wallis(&course_groups)),
    });
    results.push(Comparison {
        test: TestKind::MannWhitneyU,
        factor: Factor::Course,
        target: Target::AllQuestions,
        outcome: first_pair_mann_whitney(&course_groups),
    });

    let year_groups = counts_by(cells, &year_labels, |cell| &cell.year);
    results.push(Comparison {
        test: TestKind::KruskalWallis,
        factor: Factor::Year,
        target: Target::AllQuestions,
        outcome: outcome(stats::kruskal_wallis(&year_groups)),
    });

    results.extend(srh_comparisons(cells, Target::AllQuestions));
    results
}

/// Per-question slices of the grouped table, compared by course, by year
/// and by the two factors jointly. A course or year absent from a slice
/// makes that slice insufficient rather than shrinking the group list, so
/// the factor levels stay comparable across questions.
pub fn per_question_frequency_tests(cells: &[FrequencyCell]) -> Vec<Comparison> {
    let course_labels = cell_courses(cells);
    let year_labels = cell_years(cells);
    let mut results = Vec::new();

    for question in 1..=QUESTION_COUNT as u8 {
        let slice: Vec<FrequencyCell> = cells
            .iter()
            .filter(|cell| cell.question == question)
            .cloned()
            .collect();

        let course_groups = counts_by(&slice, &course_labels, |cell| &cell.course);
        results.push(Comparison {
            test: TestKind::KruskalWallis,
            factor: Factor::Course,
            target: Target::Question(question),
            outcome: outcome(stats::kruskal_wallis(&course_groups)),
        });
        results.push(Comparison {
            test: TestKind::MannWhitneyU,
            factor: Factor::Course,
            target: Target::Question(question),
            outcome: first_pair_mann_whitney(&course_groups),
        });

        let year_groups = counts_by(&slice, &year_labels, |cell| &cell.year);
        results.push(Comparison {
            test: TestKind::KruskalWallis,
            factor: Factor::Year,
            target: Target::Question(question),
            outcome: outcome(stats::kruskal_wallis(&year_groups)),
        });

        results.extend(srh_comparisons(&slice, Target::Question(question)));
    }

    results
}

/// Per-question percentages of one scope for one row subset; the
/// observation unit of the index-level tests.
fn scope_percentages(records: &[SurveyRecord], filter: &RowFilter, scope: Scope) -> Vec<f64> {
    let rows = filter_records(records, filter);
    let matrix = FrequencyMatrix::from_records(&rows);
    knowledge_index(&matrix, scope)
        .per_question
        .into_iter()
        .map(|share| share.percentage)
        .collect()
}

/// Knowledge-index comparisons per scope: Mann-Whitney U between the first
/// two courses (dataset order), Kruskal-Wallis across all courses and
/// across the ordered years.
pub fn index_tests(records: &[SurveyRecord]) -> Vec<Comparison> {
    let course_labels = courses(records);
    let year_labels = years_ordered(records);
    let mut results = Vec::new();

    for scope in Scope::ALL {
        let per_course: Vec<Vec<f64>> = course_labels
            .iter()
            .map(|course| {
                scope_percentages(records, &RowFilter::ByCourse(course.clone()), scope)
            })
            .collect();

        results.push(Comparison {
            test: TestKind::MannWhitneyU,
            factor: Factor::Course,
            target: Target::Index(scope),
            outcome: first_pair_mann_whitney(&per_course),
        });

        results.push(Comparison {
            test: TestKind::KruskalWallis,
            factor: Factor::Course,
            target: Target::Index(scope),
            outcome: outcome(stats::kruskal_wallis(&per_course)),
        });

        let per_year: Vec<Vec<f64>> = year_labels
            .iter()
            .map(|year| scope_percentages(records, &RowFilter::ByYear(year.clone()), scope))
            .collect();
        results.push(Comparison {
            test: TestKind::KruskalWallis,
            factor: Factor::Year,
            target: Target::Index(scope),
            outcome: outcome(stats::kruskal_wallis(&per_year)),
        });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerCategory;

    fn record(course: &str, year: &str, answer: AnswerCategory) -> SurveyRecord {
        SurveyRecord {
            course: course.to_string(),
            year: year.to_string(),
            answers: [Some(answer); QUESTION_COUNT],
        }
    }

    /// Mixed answers so rank variance never collapses: respondents split
    /// between two categories in a per-course pattern.
    fn mixed_records(pattern: &[(&str, &str, AnswerCategory, usize)]) -> Vec<SurveyRecord> {
        let mut records = Vec::new();
        for (course, year, answer, copies) in pattern {
            for _ in 0..*copies {
                records.push(record(course, year, *answer));
            }
        }
        records
    }

    #[test]
    fn identical_courses_show_no_significant_difference() {
        use AnswerCategory::{Neutral, StronglyDisagree};
        // Both courses answer with the same 2:1 category mix.
        let records = mixed_records(&[
            ("DCC", "1º", StronglyDisagree, 2),
            ("DCC", "1º", Neutral, 1),
            ("EDI", "1º", StronglyDisagree, 2),
            ("EDI", "1º", Neutral, 1),
        ]);
        let results = index_tests(&records);

        for comparison in &results {
            if comparison.factor != Factor::Course {
                continue;
            }
            match &comparison.outcome {
                Outcome::Computed { p_value, .. } => assert!(*p_value > 0.05),
                Outcome::Insufficient { .. } => {
                    panic!("two populated courses must be comparable")
                }
            }
        }
    }

    #[test]
    fn disjoint_courses_differ_on_the_overall_index() {
        use AnswerCategory::{StronglyAgree, StronglyDisagree};
        // Course A always gives the expected answer, course B always the
        // opposite extreme: A scores 100% and B 0% on every question, so
        // the percentage lists are fully separated.
        let mut records = Vec::new();
        for _ in 0..5 {
            let mut aligned = [None; QUESTION_COUNT];
            let mut opposed = [None; QUESTION_COUNT];
            for slot in 0..QUESTION_COUNT {
                let expected = crate::index::expected_answer(slot as u8 + 1);
                aligned[slot] = Some(expected);
                opposed[slot] = Some(if expected == StronglyDisagree {
                    StronglyAgree
                } else {
                    StronglyDisagree
                });
            }
            records.push(SurveyRecord {
                course: "DCC".to_string(),
                year: "1º".to_string(),
                answers: aligned,
            });
            records.push(SurveyRecord {
                course: "EDI".to_string(),
                year: "1º".to_string(),
                answers: opposed,
            });
        }
        let results = index_tests(&records);

        let overall_mw = results
            .iter()
            .find(|c| {
                c.test == TestKind::MannWhitneyU && c.target == Target::Index(Scope::Overall)
            })
            .unwrap();
        match &overall_mw.outcome {
            Outcome::Computed {
                p_value,
                significant,
                ..
            } => {
                assert!(*p_value < 0.05);
                assert!(*significant);
            }
            Outcome::Insufficient { reason } => panic!("expected a computed test: {reason}"),
        }
    }

    #[test]
    fn single_course_marks_course_tests_insufficient() {
        use AnswerCategory::{Neutral, StronglyDisagree};
        let records = mixed_records(&[
            ("DCC", "1º", StronglyDisagree, 2),
            ("DCC", "2º", Neutral, 2),
        ]);
        let results = compare_all(&records);

        // Course-factor tests degrade to markers; nothing panics.
        let course_mw = results
            .iter()
            .find(|c| c.test == TestKind::MannWhitneyU && c.factor == Factor::Course)
            .unwrap();
        assert!(matches!(
            course_mw.outcome,
            Outcome::Insufficient { .. }
        ));
        // Year-factor index tests still compute.
        let year_kw = results
            .iter()
            .find(|c| {
                c.test == TestKind::KruskalWallis
                    && c.factor == Factor::Year
                    && c.target == Target::Index(Scope::Overall)
            })
            .unwrap();
        assert!(matches!(year_kw.outcome, Outcome::Computed { .. }));
    }

    #[test]
    fn srh_rows_cover_both_factors_and_interaction() {
        use AnswerCategory::{Neutral, PartlyAgree, StronglyAgree, StronglyDisagree};
        let records = mixed_records(&[
            ("DCC", "1º", StronglyDisagree, 3),
            ("DCC", "1º", Neutral, 1),
            ("DCC", "2º", PartlyAgree, 2),
            ("DCC", "2º", Neutral, 2),
            ("EDI", "1º", StronglyAgree, 2),
            ("EDI", "1º", Neutral, 1),
            ("EDI", "2º", StronglyDisagree, 1),
            ("EDI", "2º", PartlyAgree, 3),
        ]);
        let cells = grouped_cells(&records);
        let results = global_frequency_tests(&cells);

        let srh: Vec<&Comparison> = results
            .iter()
            .filter(|c| c.test == TestKind::ScheirerRayHare)
            .collect();
        assert_eq!(srh.len(), 3);
        assert_eq!(srh[0].factor, Factor::Course);
        assert_eq!(srh[1].factor, Factor::Year);
        assert_eq!(srh[2].factor, Factor::CourseYearInteraction);
        for comparison in srh {
            assert!(matches!(comparison.outcome, Outcome::Computed { .. }));
        }
    }

    #[test]
    fn per_question_suite_covers_every_question() {
        use AnswerCategory::{Neutral, StronglyDisagree};
        let records = mixed_records(&[
            ("DCC", "1º", StronglyDisagree, 2),
            ("DCC", "2º", Neutral, 1),
            ("EDI", "1º", Neutral, 2),
            ("EDI", "2º", StronglyDisagree, 1),
        ]);
        let cells = grouped_cells(&records);
        let results = per_question_frequency_tests(&cells);

        // Two Kruskal-Wallis rows, one Mann-Whitney row and three
        // Scheirer-Ray-Hare rows per question.
        assert_eq!(results.len(), QUESTION_COUNT * 6);
        for question in 1..=QUESTION_COUNT as u8 {
            assert!(results
                .iter()
                .any(|c| c.target == Target::Question(question)));
        }
    }

    #[test]
    fn significant_filter_drops_insufficient_rows() {
        let results = vec![
            Comparison {
                test: TestKind::KruskalWallis,
                factor: Factor::Course,
                target: Target::AllQuestions,
                outcome: Outcome::Computed {
                    statistic: 9.0,
                    p_value: 0.01,
                    significant: true,
                },
            },
            Comparison {
                test: TestKind::KruskalWallis,
                factor: Factor::Year,
                target: Target::AllQuestions,
                outcome: Outcome::Computed {
                    statistic: 0.5,
                    p_value: 0.8,
                    significant: false,
                },
            },
            Comparison {
                test: TestKind::ScheirerRayHare,
                factor: Factor::CourseYearInteraction,
                target: Target::AllQuestions,
                outcome: Outcome::Insufficient {
                    reason: "an interaction cell has no observations".to_string(),
                },
            },
        ];
        let filtered = significant(&results);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].factor, Factor::Course);
    }
}
