use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::db::types::{Question, SubmissionStatus};
use crate::services::evaluator::{
    grade_mcq, status_for_score, EvaluationOutcome, Evaluator, GenerateRequest, RunOutcome,
    RunRequest,
};

const MAX_ATTEMPTS: u32 = 3;

const GENERATION_SYSTEM_PROMPT: &str = r#"You are an assessment author for a programming education platform.
Produce questions exactly matching the requested type, topic, difficulty and language.

Respond with strict JSON of the shape:
{
  "questions": [
    {"type": "programming", "description": "...", "starter_code": null,
     "test_cases": [{"input": "...", "expected_output": "...", "hidden": false}],
     "time_limit_ms": 5000, "memory_limit_mb": 256, "points": 10},
    {"type": "theory", "description": "...", "expected_keywords": ["..."],
     "min_words": 30, "max_words": 300, "points": 5},
    {"type": "mcq", "description": "...", "options": ["...", "..."],
     "correct_option": 0, "explanation": "...", "points": 2}
  ]
}

Every question must carry a positive "points" value. For mcq questions,
"correct_option" must be a valid index into "options"."#;

const EVALUATION_SYSTEM_PROMPT: &str = r#"You are a strict but fair examiner for a programming education platform.
Grade the student's answer against the question. Award partial credit where deserved.

Respond with strict JSON of the shape:
{"score": <number>, "max_score": <number>, "feedback": "<short feedback for the student>"}

"score" must be between 0 and "max_score"."#;

const RUN_SYSTEM_PROMPT: &str = r#"You are a sandboxed code execution service.
Execute the given program mentally and report what it would print.

Respond with strict JSON of the shape:
{"stdout": "...", "stderr": "...", "status": "accepted" | "error" | "timeout",
 "execution_time_ms": <number>}

Use status "error" for programs that fail to compile or crash."#;

/// OpenAI-compatible chat-completions client; the configured provider
/// (openai/groq/gemini) only changes the base URL and key.
#[derive(Debug, Clone)]
pub(crate) struct AiEvaluator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AiEvaluator {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().api_key.clone(),
            base_url: settings.ai().base_url.trim_end_matches('/').to_string(),
            model: settings.ai().model.clone(),
            max_tokens: settings.ai().max_tokens,
        })
    }

    async fn chat_json(&self, system_prompt: &str, user_prompt: String) -> Result<Value> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "response_format": {"type": "json_object"}
        });

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..MAX_ATTEMPTS {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow::anyhow!("AI provider error: {body}"));
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call AI provider"));
                }
            }

            if attempt + 1 < MAX_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .context("Missing AI response content")?;

        serde_json::from_str(content).context("Failed to parse AI JSON")
    }
}

#[async_trait]
impl Evaluator for AiEvaluator {
    async fn generate_questions(
        &self,
        request: &GenerateRequest,
    ) -> anyhow::Result<Vec<Question>> {
        let user_prompt = format!(
            "Generate {} question(s).\nType: {}\nTopic: {}\nProgramming language: {}\nDifficulty: {:?}\n",
            request.count,
            request.kind.as_str(),
            request.topic,
            request.language,
            request.difficulty,
        );

        let result = self.chat_json(GENERATION_SYSTEM_PROMPT, user_prompt).await?;
        let raw = result.get("questions").cloned().context("Missing 'questions' in AI response")?;
        let questions: Vec<Question> =
            serde_json::from_value(raw).context("AI questions did not match expected shape")?;

        if questions.is_empty() {
            anyhow::bail!("AI returned no questions");
        }
        for question in &questions {
            if question.points() <= 0 {
                anyhow::bail!("AI returned a question with non-positive points");
            }
            if let Question::Mcq { options, correct_option, .. } = question {
                if options.len() < 2 || *correct_option >= options.len() {
                    anyhow::bail!("AI returned an mcq question with invalid options");
                }
            }
        }

        Ok(questions)
    }

    async fn evaluate(
        &self,
        question: &Question,
        answer: &str,
    ) -> anyhow::Result<EvaluationOutcome> {
        // MCQ grading is a pure index comparison; no provider round-trip.
        if let Question::Mcq { options, correct_option, explanation, points, .. } = question {
            return Ok(grade_mcq(options, *correct_option, explanation.as_deref(), *points, answer));
        }

        let max_score = question.points() as f64;
        let user_prompt = match question {
            Question::Programming { description, test_cases, .. } => {
                let cases = serde_json::to_string_pretty(test_cases).unwrap_or_default();
                format!(
                    "Question type: programming\nMaximum score: {max_score}\n\nQuestion:\n{description}\n\nTest cases:\n{cases}\n\nStudent's code:\n{answer}\n"
                )
            }
            Question::Theory { description, expected_keywords, .. } => {
                format!(
                    "Question type: theory\nMaximum score: {max_score}\nExpected keywords: {}\n\nQuestion:\n{description}\n\nStudent's answer:\n{answer}\n",
                    expected_keywords.join(", ")
                )
            }
            Question::Mcq { .. } => unreachable!("mcq graded locally"),
        };

        let result = self.chat_json(EVALUATION_SYSTEM_PROMPT, user_prompt).await?;
        let score = result
            .get("score")
            .and_then(|value| value.as_f64())
            .context("Missing 'score' in AI response")?
            .clamp(0.0, max_score);
        let feedback = result
            .get("feedback")
            .and_then(|value| value.as_str())
            .unwrap_or("No feedback provided.")
            .to_string();

        Ok(EvaluationOutcome {
            score,
            max_score,
            feedback,
            status: status_for_score(score, max_score),
            execution_time_ms: None,
            memory_used_kb: None,
        })
    }

    async fn run_code(&self, request: &RunRequest) -> anyhow::Result<RunOutcome> {
        let stdin = request.stdin.as_deref().unwrap_or("");
        let user_prompt = format!(
            "Language: {}\n\nProgram:\n{}\n\nStandard input:\n{}\n",
            request.language, request.code, stdin
        );

        let result = self.chat_json(RUN_SYSTEM_PROMPT, user_prompt).await?;
        let stdout =
            result.get("stdout").and_then(|value| value.as_str()).unwrap_or("").to_string();
        let stderr =
            result.get("stderr").and_then(|value| value.as_str()).unwrap_or("").to_string();
        let status = match result.get("status").and_then(|value| value.as_str()) {
            Some("error") => SubmissionStatus::Error,
            Some("timeout") => SubmissionStatus::Timeout,
            _ => SubmissionStatus::Accepted,
        };
        let execution_time_ms = result.get("execution_time_ms").and_then(|value| value.as_i64());

        Ok(RunOutcome { stdout, stderr, status, execution_time_ms })
    }
}
