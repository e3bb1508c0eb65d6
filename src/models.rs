use serde::Serialize;

/// Number of Likert questions in the survey, bound to CSV columns 3..32.
pub const QUESTION_COUNT: usize = 30;
/// Number of answer categories on the Likert scale.
pub const CATEGORY_COUNT: usize = 5;

/// One respondent's row: identifying fields plus the 30 ordered answers.
/// An unanswered question is `None` and contributes no count.
#[derive(Debug, Clone)]
pub struct SurveyRecord {
    pub course: String,
    pub year: String,
    pub answers: [Option<AnswerCategory>; QUESTION_COUNT],
}

/// The five-point Likert scale used by every question. Counting treats the
/// categories as nominal labels; the declaration order is the scale order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AnswerCategory {
    #[serde(rename = "Discordo totalmente")]
    StronglyDisagree,
    #[serde(rename = "Discordo parcialmente")]
    PartlyDisagree,
    #[serde(rename = "Não concordo, nem discordo")]
    Neutral,
    #[serde(rename = "Concordo parcialmente")]
    PartlyAgree,
    #[serde(rename = "Concordo totalmente")]
    StronglyAgree,
}

impl AnswerCategory {
    pub const ALL: [AnswerCategory; CATEGORY_COUNT] = [
        AnswerCategory::StronglyDisagree,
        AnswerCategory::PartlyDisagree,
        AnswerCategory::Neutral,
        AnswerCategory::PartlyAgree,
        AnswerCategory::StronglyAgree,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AnswerCategory::StronglyDisagree => "Discordo totalmente",
            AnswerCategory::PartlyDisagree => "Discordo parcialmente",
            AnswerCategory::Neutral => "Não concordo, nem discordo",
            AnswerCategory::PartlyAgree => "Concordo parcialmente",
            AnswerCategory::StronglyAgree => "Concordo totalmente",
        }
    }

    pub fn parse(text: &str) -> Option<AnswerCategory> {
        let trimmed = text.trim();
        AnswerCategory::ALL
            .into_iter()
            .find(|category| category.label() == trimmed)
    }

    /// Position on the scale, used to index frequency rows.
    pub fn position(&self) -> usize {
        *self as usize
    }
}

/// Question grouping over which a knowledge index is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scope {
    Overall,
    GeneroSexualidade,
    Racismo,
    Legislacao,
}

impl Scope {
    pub const ALL: [Scope; 4] = [
        Scope::Overall,
        Scope::GeneroSexualidade,
        Scope::Racismo,
        Scope::Legislacao,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Scope::Overall => "Conhecimento Geral",
            Scope::GeneroSexualidade => "Gênero e Sexualidade",
            Scope::Racismo => "Racismo",
            Scope::Legislacao => "Legislação",
        }
    }

    /// Questions assigned to this scope, in question order.
    pub fn question_ids(&self) -> std::ops::RangeInclusive<u8> {
        match self {
            Scope::Overall => 1..=30,
            Scope::GeneroSexualidade => 1..=10,
            Scope::Racismo => 11..=20,
            Scope::Legislacao => 21..=30,
        }
    }
}

/// One observed row of the melted frequency table: how many respondents of a
/// (course, year) group gave `category` on `question`. Zero-count
/// combinations are not materialized.
#[derive(Debug, Clone, Serialize)]
pub struct FrequencyCell {
    pub course: String,
    pub year: String,
    pub question: u8,
    pub category: AnswerCategory,
    pub count: u64,
}

/// Share of respondents who gave the expected answer on one question.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionShare {
    pub question: u8,
    pub expected: AnswerCategory,
    pub percentage: f64,
}

/// A scope's knowledge index: the per-question expected-answer percentages
/// and their mean over the fixed scope size.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeIndex {
    pub scope: Scope,
    pub per_question: Vec<QuestionShare>,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestKind {
    KruskalWallis,
    MannWhitneyU,
    ScheirerRayHare,
}

impl TestKind {
    pub fn label(&self) -> &'static str {
        match self {
            TestKind::KruskalWallis => "Kruskal-Wallis",
            TestKind::MannWhitneyU => "Mann-Whitney U",
            TestKind::ScheirerRayHare => "Scheirer-Ray-Hare",
        }
    }
}

/// Factor whose levels are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Factor {
    Course,
    Year,
    CourseYearInteraction,
}

impl Factor {
    pub fn label(&self) -> &'static str {
        match self {
            Factor::Course => "Curso",
            Factor::Year => "Ano",
            Factor::CourseYearInteraction => "Curso x Ano",
        }
    }
}

/// What the compared observations were drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Target {
    /// Grouped frequency counts over all 30 questions.
    AllQuestions,
    /// Grouped frequency counts of a single question.
    Question(u8),
    /// Per-question knowledge-index percentages of a scope.
    Index(Scope),
}

impl Target {
    pub fn describe(&self) -> String {
        match self {
            Target::AllQuestions => "todas as questões".to_string(),
            Target::Question(question) => format!("Q{question}"),
            Target::Index(scope) => format!("índice {}", scope.label()),
        }
    }
}

/// A comparison either yields a statistic or degrades to an explicit
/// insufficient-data marker; it never raises.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Computed {
        statistic: f64,
        p_value: f64,
        significant: bool,
    },
    Insufficient {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub test: TestKind,
    pub factor: Factor,
    pub target: Target,
    pub outcome: Outcome,
}

/// Number of respondents in one (course, year) group.
#[derive(Debug, Clone, Serialize)]
pub struct RespondentCount {
    pub course: String,
    pub year: String,
    pub respondents: usize,
}

/// Descriptive statistics of the grouped frequency counts of one
/// (course, year) group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupFrequencyStats {
    pub course: String,
    pub year: String,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: u64,
    pub max: u64,
}
