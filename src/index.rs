use crate::frequency::FrequencyMatrix;
use crate::models::{AnswerCategory, KnowledgeIndex, QuestionShare, Scope};

/// Questionnaire-defined correct answer per question: 17 questions expect
/// "Discordo totalmente" and 13 expect "Concordo totalmente". Fixed domain
/// knowledge, not derivable from the data. The Legislação block keeps its
/// 2/8 split on purpose (reverse-coded items).
pub fn expected_answer(question: u8) -> AnswerCategory {
    match question {
        1..=7 | 11..=13 | 15..=19 | 22 | 23 => AnswerCategory::StronglyDisagree,
        _ => AnswerCategory::StronglyAgree,
    }
}

/// Computes a scope's knowledge index from a frequency matrix: the share of
/// respondents who gave the expected answer per question, averaged over the
/// fixed number of scope questions. A question nobody answered contributes
/// 0% and still counts toward the divisor.
pub fn knowledge_index(matrix: &FrequencyMatrix, scope: Scope) -> KnowledgeIndex {
    let questions = scope.question_ids();
    let divisor = questions.clone().count() as f64;

    let mut per_question = Vec::with_capacity(divisor as usize);
    let mut sum = 0.0;
    for question in questions {
        let expected = expected_answer(question);
        let total = matrix.total(question);
        let percentage = if total == 0 {
            0.0
        } else {
            100.0 * matrix.count(question, expected) as f64 / total as f64
        };
        sum += percentage;
        per_question.push(QuestionShare {
            question,
            expected,
            percentage,
        });
    }

    KnowledgeIndex {
        scope,
        per_question,
        mean: sum / divisor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SurveyRecord, QUESTION_COUNT};

    fn record(answers: [Option<AnswerCategory>; QUESTION_COUNT]) -> SurveyRecord {
        SurveyRecord {
            course: "DCC".to_string(),
            year: "1º".to_string(),
            answers,
        }
    }

    fn matrix_of(records: &[SurveyRecord]) -> FrequencyMatrix {
        let refs: Vec<&SurveyRecord> = records.iter().collect();
        FrequencyMatrix::from_records(&refs)
    }

    #[test]
    fn expected_map_partitions_seventeen_thirteen() {
        let disagree = (1..=30u8)
            .filter(|&q| expected_answer(q) == AnswerCategory::StronglyDisagree)
            .count();
        let agree = (1..=30u8)
            .filter(|&q| expected_answer(q) == AnswerCategory::StronglyAgree)
            .count();
        assert_eq!(disagree, 17);
        assert_eq!(agree, 13);
        // Legislação keeps its reverse-coded 2/8 split.
        let legislacao_disagree = (21..=30u8)
            .filter(|&q| expected_answer(q) == AnswerCategory::StronglyDisagree)
            .count();
        assert_eq!(legislacao_disagree, 2);
    }

    #[test]
    fn unanimous_expected_answer_scores_full_marks_on_q1() {
        let records: Vec<SurveyRecord> = (0..10)
            .map(|_| record([Some(AnswerCategory::StronglyDisagree); QUESTION_COUNT]))
            .collect();
        let index = knowledge_index(&matrix_of(&records), Scope::GeneroSexualidade);

        let q1 = &index.per_question[0];
        assert_eq!(q1.question, 1);
        assert_eq!(q1.expected, AnswerCategory::StronglyDisagree);
        assert!((q1.percentage - 100.0).abs() < 1e-12);
    }

    #[test]
    fn zero_response_question_contributes_zero_not_an_error() {
        let mut answers = [Some(AnswerCategory::StronglyDisagree); QUESTION_COUNT];
        answers[4] = None;
        let records = vec![record(answers)];
        let index = knowledge_index(&matrix_of(&records), Scope::GeneroSexualidade);

        let q5 = index.per_question.iter().find(|s| s.question == 5).unwrap();
        assert_eq!(q5.percentage, 0.0);
        // The empty question still drags the fixed-divisor mean down.
        // Q1-Q7 expect disagreement, Q8-Q10 expect agreement: 6 of the 10
        // scope questions score 100%.
        assert!((index.mean - 60.0).abs() < 1e-12);
    }

    #[test]
    fn indices_stay_within_percentage_bounds() {
        let records = vec![
            record([Some(AnswerCategory::StronglyDisagree); QUESTION_COUNT]),
            record([Some(AnswerCategory::PartlyAgree); QUESTION_COUNT]),
            record([Some(AnswerCategory::StronglyAgree); QUESTION_COUNT]),
        ];
        let matrix = matrix_of(&records);
        for scope in Scope::ALL {
            let index = knowledge_index(&matrix, scope);
            assert!(index.mean >= 0.0 && index.mean <= 100.0);
            assert!(index
                .per_question
                .iter()
                .all(|s| s.percentage >= 0.0 && s.percentage <= 100.0));
        }
    }

    #[test]
    fn half_split_everywhere_yields_overall_fifty() {
        // One respondent on the expected answer, one on its opposite: every
        // question lands at exactly 50%, for both expected directions.
        let records = vec![
            record([Some(AnswerCategory::StronglyDisagree); QUESTION_COUNT]),
            record([Some(AnswerCategory::StronglyAgree); QUESTION_COUNT]),
        ];
        let index = knowledge_index(&matrix_of(&records), Scope::Overall);

        assert_eq!(index.per_question.len(), 30);
        assert!(index
            .per_question
            .iter()
            .all(|s| (s.percentage - 50.0).abs() < 1e-12));
        assert!((index.mean - 50.0).abs() < 1e-12);
    }
}
