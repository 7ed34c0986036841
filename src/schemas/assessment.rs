use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Assessment;
use crate::db::types::{Difficulty, Question, QuestionMix};
use crate::services::session_timing;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssessmentCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[validate(length(min = 1, message = "topic must not be empty"))]
    pub(crate) topic: String,
    #[validate(length(min = 1, message = "language must not be empty"))]
    pub(crate) language: String,
    #[serde(default = "default_difficulty")]
    pub(crate) difficulty: Difficulty,
    #[serde(alias = "durationMinutes")]
    pub(crate) duration_minutes: i32,
    pub(crate) questions: Vec<Question>,
    #[serde(default)]
    #[serde(alias = "assignedEmails")]
    pub(crate) assigned_emails: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GenerateQuestionsRequest {
    #[validate(length(min = 1, message = "topic must not be empty"))]
    pub(crate) topic: String,
    #[validate(length(min = 1, message = "language must not be empty"))]
    pub(crate) language: String,
    #[serde(default = "default_difficulty")]
    pub(crate) difficulty: Difficulty,
    #[serde(default)]
    #[serde(alias = "questionMix")]
    pub(crate) question_mix: QuestionMix,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignStudentsRequest {
    pub(crate) emails: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssessmentResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) topic: String,
    pub(crate) language: String,
    pub(crate) difficulty: Difficulty,
    pub(crate) duration_minutes: i32,
    pub(crate) question_count: usize,
    pub(crate) max_score: f64,
    pub(crate) question_mix: QuestionMix,
    pub(crate) questions: Vec<serde_json::Value>,
    pub(crate) assigned_emails: Vec<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl AssessmentResponse {
    /// `include_answers` distinguishes the teacher view from the student
    /// view; the student view never carries answer-key material.
    pub(crate) fn from_db(assessment: Assessment, include_answers: bool) -> Self {
        let max_score = session_timing::max_score(&assessment.questions.0);
        let questions = assessment
            .questions
            .0
            .iter()
            .map(|question| question_to_json(question, include_answers))
            .collect();

        Self {
            id: assessment.id,
            title: assessment.title,
            topic: assessment.topic,
            language: assessment.language,
            difficulty: assessment.difficulty,
            duration_minutes: assessment.duration_minutes,
            question_count: assessment.questions.0.len(),
            max_score,
            question_mix: assessment.question_mix.0,
            questions,
            assigned_emails: assessment.assigned_emails.0,
            is_active: assessment.is_active,
            created_at: format_primitive(assessment.created_at),
            updated_at: format_primitive(assessment.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignedAssessmentResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) topic: String,
    pub(crate) language: String,
    pub(crate) difficulty: Difficulty,
    pub(crate) duration_minutes: i32,
    pub(crate) question_count: usize,
    pub(crate) max_score: f64,
    pub(crate) status: AttemptStatus,
    pub(crate) percentage: Option<i32>,
    pub(crate) created_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeneratedQuestionsResponse {
    pub(crate) questions: Vec<Question>,
    pub(crate) fallback: bool,
}

/// The student view strips hidden test cases, correct option indices,
/// explanations and expected keywords; the teacher view keeps everything.
pub(crate) fn question_to_json(question: &Question, include_answers: bool) -> serde_json::Value {
    match question {
        Question::Programming {
            description,
            starter_code,
            test_cases,
            time_limit_ms,
            memory_limit_mb,
            points,
        } => {
            let visible: Vec<serde_json::Value> = test_cases
                .iter()
                .filter(|case| include_answers || !case.hidden)
                .map(|case| {
                    json!({
                        "input": case.input,
                        "expected_output": case.expected_output,
                        "hidden": case.hidden,
                    })
                })
                .collect();

            json!({
                "type": "programming",
                "description": description,
                "starter_code": starter_code,
                "test_cases": visible,
                "time_limit_ms": time_limit_ms,
                "memory_limit_mb": memory_limit_mb,
                "points": points,
            })
        }
        Question::Theory { description, expected_keywords, min_words, max_words, points } => {
            let mut value = json!({
                "type": "theory",
                "description": description,
                "min_words": min_words,
                "max_words": max_words,
                "points": points,
            });
            if include_answers {
                value["expected_keywords"] = json!(expected_keywords);
            }
            value
        }
        Question::Mcq { description, options, correct_option, explanation, points } => {
            let mut value = json!({
                "type": "mcq",
                "description": description,
                "options": options,
                "points": points,
            });
            if include_answers {
                value["correct_option"] = json!(correct_option);
                value["explanation"] = json!(explanation);
            }
            value
        }
    }
}

fn default_difficulty() -> Difficulty {
    Difficulty::Intermediate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::TestCase;

    fn sample_questions() -> Vec<Question> {
        vec![
            Question::Programming {
                description: "Implement fizzbuzz".into(),
                starter_code: None,
                test_cases: vec![
                    TestCase {
                        input: "3".into(),
                        expected_output: "Fizz".into(),
                        hidden: false,
                    },
                    TestCase { input: "15".into(), expected_output: "FizzBuzz".into(), hidden: true },
                ],
                time_limit_ms: 5_000,
                memory_limit_mb: 256,
                points: 10,
            },
            Question::Mcq {
                description: "Pick one".into(),
                options: vec!["a".into(), "b".into()],
                correct_option: 1,
                explanation: Some("b is right".into()),
                points: 5,
            },
            Question::Theory {
                description: "Explain borrowing".into(),
                expected_keywords: vec!["lifetime".into()],
                min_words: None,
                max_words: None,
                points: 5,
            },
        ]
    }

    #[test]
    fn student_view_strips_answer_material() {
        let questions = sample_questions();

        let programming = question_to_json(&questions[0], false);
        assert_eq!(programming["test_cases"].as_array().unwrap().len(), 1);

        let mcq = question_to_json(&questions[1], false);
        assert!(mcq.get("correct_option").is_none());
        assert!(mcq.get("explanation").is_none());
        assert_eq!(mcq["options"].as_array().unwrap().len(), 2);

        let theory = question_to_json(&questions[2], false);
        assert!(theory.get("expected_keywords").is_none());
    }

    #[test]
    fn teacher_view_keeps_answer_material() {
        let questions = sample_questions();

        let programming = question_to_json(&questions[0], true);
        assert_eq!(programming["test_cases"].as_array().unwrap().len(), 2);

        let mcq = question_to_json(&questions[1], true);
        assert_eq!(mcq["correct_option"], 1);
        assert_eq!(mcq["explanation"], "b is right");

        let theory = question_to_json(&questions[2], true);
        assert_eq!(theory["expected_keywords"][0], "lifetime");
    }
}
