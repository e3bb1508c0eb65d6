use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};

use crate::models::{AnswerCategory, RespondentCount, SurveyRecord, QUESTION_COUNT};

/// Leading CSV columns: an unused identifier, the course and the year.
/// Question answers start right after and are bound positionally, so the
/// column order defines the question ids regardless of header text.
const ANSWER_COLUMN_OFFSET: usize = 3;

pub fn load_csv(path: &Path) -> anyhow::Result<Vec<SurveyRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut records = Vec::new();

    for (index, result) in reader.records().enumerate() {
        // Header row is consumed by the reader, so data rows start at line 2.
        let line = index + 2;
        let row = result.with_context(|| format!("failed to read line {line}"))?;

        if row.len() < ANSWER_COLUMN_OFFSET + QUESTION_COUNT {
            bail!(
                "line {line} has {} columns, expected at least {}",
                row.len(),
                ANSWER_COLUMN_OFFSET + QUESTION_COUNT
            );
        }

        let mut answers = [None; QUESTION_COUNT];
        for (slot, answer) in answers.iter_mut().enumerate() {
            let cell = row[ANSWER_COLUMN_OFFSET + slot].trim();
            if cell.is_empty() {
                continue;
            }
            let category = AnswerCategory::parse(cell).with_context(|| {
                format!(
                    "line {line}: unrecognized answer {:?} for question {}",
                    cell,
                    slot + 1
                )
            })?;
            *answer = Some(category);
        }

        records.push(SurveyRecord {
            course: row[1].trim().to_string(),
            year: row[2].trim().to_string(),
            answers,
        });
    }

    Ok(records)
}

/// Which subset of the dataset an aggregation runs over.
#[derive(Debug, Clone)]
pub enum RowFilter {
    None,
    ByCourse(String),
    ByYear(String),
    ByCourseAndYear(String, String),
}

impl RowFilter {
    pub fn from_options(course: Option<String>, year: Option<String>) -> RowFilter {
        match (course, year) {
            (Some(course), Some(year)) => RowFilter::ByCourseAndYear(course, year),
            (Some(course), None) => RowFilter::ByCourse(course),
            (None, Some(year)) => RowFilter::ByYear(year),
            (None, None) => RowFilter::None,
        }
    }

    pub fn matches(&self, record: &SurveyRecord) -> bool {
        match self {
            RowFilter::None => true,
            RowFilter::ByCourse(course) => record.course == *course,
            RowFilter::ByYear(year) => record.year == *year,
            RowFilter::ByCourseAndYear(course, year) => {
                record.course == *course && record.year == *year
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RowFilter::None => "todos os respondentes".to_string(),
            RowFilter::ByCourse(course) => format!("curso {course}"),
            RowFilter::ByYear(year) => format!("ano {year}"),
            RowFilter::ByCourseAndYear(course, year) => {
                format!("curso {course}, ano {year}")
            }
        }
    }
}

pub fn filter_records<'a>(
    records: &'a [SurveyRecord],
    filter: &RowFilter,
) -> Vec<&'a SurveyRecord> {
    records.iter().filter(|record| filter.matches(record)).collect()
}

/// Distinct courses in first-appearance order.
pub fn courses(records: &[SurveyRecord]) -> Vec<String> {
    let mut seen = Vec::new();
    for record in records {
        if !seen.contains(&record.course) {
            seen.push(record.course.clone());
        }
    }
    seen
}

/// Distinct years ordered from 1º to 3º; labels without a leading digit
/// sort after the numbered ones.
pub fn years_ordered(records: &[SurveyRecord]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for record in records {
        if !seen.contains(&record.year) {
            seen.push(record.year.clone());
        }
    }
    seen.sort_by_key(|year| year_sort_key(year));
    seen
}

pub fn year_sort_key(year: &str) -> (u32, String) {
    let leading = year
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .unwrap_or(u32::MAX);
    (leading, year.to_string())
}

/// Respondent headcount per (course, year) group, course then year order.
pub fn respondent_counts(records: &[SurveyRecord]) -> Vec<RespondentCount> {
    let mut counts: HashMap<(String, String), usize> = HashMap::new();
    for record in records {
        *counts
            .entry((record.course.clone(), record.year.clone()))
            .or_insert(0) += 1;
    }

    let mut groups: Vec<RespondentCount> = counts
        .into_iter()
        .map(|((course, year), respondents)| RespondentCount {
            course,
            year,
            respondents,
        })
        .collect();
    groups.sort_by(|a, b| {
        a.course
            .cmp(&b.course)
            .then_with(|| year_sort_key(&a.year).cmp(&year_sort_key(&b.year)))
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerCategory;

    fn record(course: &str, year: &str) -> SurveyRecord {
        SurveyRecord {
            course: course.to_string(),
            year: year.to_string(),
            answers: [Some(AnswerCategory::Neutral); QUESTION_COUNT],
        }
    }

    #[test]
    fn loads_positionally_bound_columns() {
        let mut csv_text = String::from("id,Curso,Em qual ano você está?");
        for question in 1..=QUESTION_COUNT {
            csv_text.push_str(&format!(",Pergunta {question}"));
        }
        csv_text.push_str("\n1,DCC,1º");
        for _ in 0..QUESTION_COUNT {
            csv_text.push_str(",Discordo totalmente");
        }
        csv_text.push('\n');

        let dir = std::env::temp_dir().join("survey-insights-loader-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("responses.csv");
        std::fs::write(&path, csv_text).unwrap();

        let records = load_csv(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].course, "DCC");
        assert_eq!(records[0].year, "1º");
        assert!(records[0]
            .answers
            .iter()
            .all(|a| *a == Some(AnswerCategory::StronglyDisagree)));
    }

    #[test]
    fn rejects_short_rows() {
        let dir = std::env::temp_dir().join("survey-insights-loader-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("short.csv");
        std::fs::write(&path, "id,Curso,Ano,Q1\n1,DCC,1º,Discordo totalmente\n").unwrap();

        assert!(load_csv(&path).is_err());
    }

    #[test]
    fn filters_select_matching_records() {
        let records = vec![record("DCC", "1º"), record("DCC", "2º"), record("EDI", "1º")];

        let by_course = filter_records(&records, &RowFilter::ByCourse("DCC".to_string()));
        assert_eq!(by_course.len(), 2);

        let by_year = filter_records(&records, &RowFilter::ByYear("1º".to_string()));
        assert_eq!(by_year.len(), 2);

        let both = filter_records(
            &records,
            &RowFilter::ByCourseAndYear("EDI".to_string(), "1º".to_string()),
        );
        assert_eq!(both.len(), 1);
        assert_eq!(filter_records(&records, &RowFilter::None).len(), 3);
    }

    #[test]
    fn years_sort_by_leading_digit() {
        let records = vec![record("DCC", "3º"), record("DCC", "1º"), record("EDI", "2º")];
        assert_eq!(years_ordered(&records), vec!["1º", "2º", "3º"]);
    }

    #[test]
    fn respondent_counts_group_by_course_and_year() {
        let records = vec![record("DCC", "1º"), record("DCC", "1º"), record("EDI", "2º")];
        let counts = respondent_counts(&records);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].course, "DCC");
        assert_eq!(counts[0].respondents, 2);
        assert_eq!(counts[1].course, "EDI");
        assert_eq!(counts[1].respondents, 1);
    }
}
