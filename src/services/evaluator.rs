use async_trait::async_trait;

use crate::db::types::{Difficulty, Question, QuestionKind, SubmissionStatus, TestCase};

#[derive(Debug, Clone)]
pub(crate) struct GenerateRequest {
    pub(crate) kind: QuestionKind,
    pub(crate) topic: String,
    pub(crate) language: String,
    pub(crate) difficulty: Difficulty,
    pub(crate) count: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct EvaluationOutcome {
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) feedback: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) execution_time_ms: Option<i64>,
    pub(crate) memory_used_kb: Option<i64>,
}

#[derive(Debug, Clone)]
pub(crate) struct RunRequest {
    pub(crate) language: String,
    pub(crate) code: String,
    pub(crate) stdin: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct RunOutcome {
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) execution_time_ms: Option<i64>,
}

/// External scoring/generation collaborator. Constructed once at startup and
/// injected through app state so tests can substitute a deterministic fake.
/// Callers own the degraded paths: generation failures fall back to
/// placeholder questions, evaluation failures leave the submission pending.
#[async_trait]
pub(crate) trait Evaluator: Send + Sync {
    async fn generate_questions(&self, request: &GenerateRequest)
        -> anyhow::Result<Vec<Question>>;

    async fn evaluate(
        &self,
        question: &Question,
        answer: &str,
    ) -> anyhow::Result<EvaluationOutcome>;

    async fn run_code(&self, request: &RunRequest) -> anyhow::Result<RunOutcome>;
}

pub(crate) fn status_for_score(score: f64, max_score: f64) -> SubmissionStatus {
    if max_score > 0.0 && score >= max_score {
        SubmissionStatus::Accepted
    } else if score > 0.0 {
        SubmissionStatus::Partial
    } else {
        SubmissionStatus::Wrong
    }
}

/// MCQ answers are graded locally; the answer is the selected option index,
/// or the option text as a fallback.
pub(crate) fn grade_mcq(
    options: &[String],
    correct_option: usize,
    explanation: Option<&str>,
    points: i32,
    answer: &str,
) -> EvaluationOutcome {
    let selected = answer
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|index| *index < options.len())
        .or_else(|| options.iter().position(|option| option.trim() == answer.trim()));

    let max_score = points as f64;
    let correct = selected == Some(correct_option);
    let score = if correct { max_score } else { 0.0 };

    let mut feedback =
        if correct { "Correct answer.".to_string() } else { "Incorrect answer.".to_string() };
    if !correct {
        if let Some(explanation) = explanation {
            feedback = format!("Incorrect answer. {explanation}");
        }
    }

    EvaluationOutcome {
        score,
        max_score,
        feedback,
        status: status_for_score(score, max_score),
        execution_time_ms: None,
        memory_used_kb: None,
    }
}

/// Deterministic stand-ins used when question generation is unavailable, so
/// assessment creation can still proceed.
pub(crate) fn placeholder_questions(request: &GenerateRequest) -> Vec<Question> {
    let count = request.count.max(1);
    (1..=count)
        .map(|index| match request.kind {
            QuestionKind::Programming => Question::Programming {
                description: format!(
                    "Placeholder question {index}: write a {} function related to {}.",
                    request.language, request.topic
                ),
                starter_code: None,
                test_cases: vec![TestCase {
                    input: String::new(),
                    expected_output: String::new(),
                    hidden: false,
                }],
                time_limit_ms: 5_000,
                memory_limit_mb: 256,
                points: 10,
            },
            QuestionKind::Theory => Question::Theory {
                description: format!(
                    "Placeholder question {index}: explain a key concept of {}.",
                    request.topic
                ),
                expected_keywords: vec![request.topic.to_lowercase()],
                min_words: Some(30),
                max_words: Some(300),
                points: 5,
            },
            QuestionKind::Mcq => Question::Mcq {
                description: format!(
                    "Placeholder question {index}: which statement about {} is correct?",
                    request.topic
                ),
                options: vec![
                    "Statement A".to_string(),
                    "Statement B".to_string(),
                    "Statement C".to_string(),
                    "Statement D".to_string(),
                ],
                correct_option: 0,
                explanation: None,
                points: 2,
            },
        })
        .collect()
}
