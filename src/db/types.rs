use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Teacher,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficulty", rename_all = "lowercase")]
pub(crate) enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "submissionstatus", rename_all = "lowercase")]
pub(crate) enum SubmissionStatus {
    Pending,
    Running,
    Accepted,
    Wrong,
    Error,
    Timeout,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum QuestionKind {
    Programming,
    Theory,
    Mcq,
}

impl QuestionKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Programming => "programming",
            Self::Theory => "theory",
            Self::Mcq => "mcq",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TestCase {
    pub(crate) input: String,
    pub(crate) expected_output: String,
    #[serde(default)]
    pub(crate) hidden: bool,
}

/// A question embedded in an assessment. Questions have no identity outside
/// their parent; submissions reference them by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum Question {
    Programming {
        description: String,
        #[serde(default)]
        starter_code: Option<String>,
        #[serde(default)]
        test_cases: Vec<TestCase>,
        #[serde(default = "default_time_limit_ms")]
        time_limit_ms: i64,
        #[serde(default = "default_memory_limit_mb")]
        memory_limit_mb: i64,
        points: i32,
    },
    Theory {
        description: String,
        #[serde(default)]
        expected_keywords: Vec<String>,
        #[serde(default)]
        min_words: Option<u32>,
        #[serde(default)]
        max_words: Option<u32>,
        points: i32,
    },
    Mcq {
        description: String,
        options: Vec<String>,
        correct_option: usize,
        #[serde(default)]
        explanation: Option<String>,
        points: i32,
    },
}

impl Question {
    pub(crate) fn points(&self) -> i32 {
        match self {
            Self::Programming { points, .. }
            | Self::Theory { points, .. }
            | Self::Mcq { points, .. } => *points,
        }
    }

    pub(crate) fn description(&self) -> &str {
        match self {
            Self::Programming { description, .. }
            | Self::Theory { description, .. }
            | Self::Mcq { description, .. } => description,
        }
    }

    pub(crate) fn kind(&self) -> QuestionKind {
        match self {
            Self::Programming { .. } => QuestionKind::Programming,
            Self::Theory { .. } => QuestionKind::Theory,
            Self::Mcq { .. } => QuestionKind::Mcq,
        }
    }
}

/// Declared per-variant question counts, derived from the question list at
/// creation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct QuestionMix {
    #[serde(default)]
    pub(crate) programming: u32,
    #[serde(default)]
    pub(crate) theory: u32,
    #[serde(default)]
    pub(crate) mcq: u32,
}

impl QuestionMix {
    pub(crate) fn of(questions: &[Question]) -> Self {
        let mut mix = Self::default();
        for question in questions {
            match question.kind() {
                QuestionKind::Programming => mix.programming += 1,
                QuestionKind::Theory => mix.theory += 1,
                QuestionKind::Mcq => mix.mcq += 1,
            }
        }
        mix
    }
}

fn default_time_limit_ms() -> i64 {
    5_000
}

fn default_memory_limit_mb() -> i64 {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_union_roundtrips_by_tag() {
        let raw = serde_json::json!({
            "type": "mcq",
            "description": "Which keyword declares an immutable binding?",
            "options": ["let", "var", "const", "static"],
            "correct_option": 0,
            "points": 5
        });

        let question: Question = serde_json::from_value(raw).expect("mcq question");
        assert_eq!(question.points(), 5);
        assert_eq!(question.kind(), QuestionKind::Mcq);

        let encoded = serde_json::to_value(&question).expect("encode");
        assert_eq!(encoded["type"], "mcq");
        assert_eq!(encoded["correct_option"], 0);
    }

    #[test]
    fn programming_defaults_apply() {
        let raw = serde_json::json!({
            "type": "programming",
            "description": "Reverse a string",
            "points": 10
        });

        let question: Question = serde_json::from_value(raw).expect("programming question");
        match question {
            Question::Programming { time_limit_ms, memory_limit_mb, test_cases, .. } => {
                assert_eq!(time_limit_ms, 5_000);
                assert_eq!(memory_limit_mb, 256);
                assert!(test_cases.is_empty());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn question_mix_counts_variants() {
        let questions = vec![
            Question::Theory {
                description: "Explain ownership".into(),
                expected_keywords: vec!["move".into()],
                min_words: None,
                max_words: None,
                points: 5,
            },
            Question::Mcq {
                description: "Pick one".into(),
                options: vec!["a".into(), "b".into()],
                correct_option: 1,
                explanation: None,
                points: 2,
            },
            Question::Mcq {
                description: "Pick another".into(),
                options: vec!["a".into(), "b".into()],
                correct_option: 0,
                explanation: None,
                points: 2,
            },
        ];

        let mix = QuestionMix::of(&questions);
        assert_eq!(mix.programming, 0);
        assert_eq!(mix.theory, 1);
        assert_eq!(mix.mcq, 2);
    }
}
