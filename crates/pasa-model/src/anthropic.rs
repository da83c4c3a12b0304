use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use pasa_core::config::AppConfig;
use pasa_core::error::{PasaError, Result};
use pasa_core::model::ModelClient;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 512;
const SCORE_MAX_TOKENS: u32 = 16;
/// In-flight requests per client, shared by its clones.
const MAX_CONCURRENT_REQUESTS: usize = 8;

const CRAWLER_SYSTEM: &str = "You are an elite researcher helping to find academic papers. \
Follow the output format requested in the prompt exactly.";

const SELECTOR_SYSTEM: &str = "You judge whether a paper satisfies a research query. \
Reply with a single number between 0 and 1: the probability that the paper fully satisfies \
the query. Output only the number.";

/// `ModelClient` over the Anthropic Messages API. Clones share the HTTP pool
/// and the in-flight limit.
#[derive(Clone)]
pub struct AnthropicModelClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    limiter: Arc<Semaphore>,
}

// ── Messages API wire types ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserTurn<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Text of the first `text` block in a Messages API response body.
fn reply_text(body: &str) -> Result<String> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| PasaError::Model(format!("unreadable model response: {e}")))?;
    let stop_reason = response.stop_reason;
    let text = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .find_map(|block| block.text)
        .ok_or_else(|| PasaError::Model("model response has no text block".into()))?;

    tracing::debug!(stop_reason = ?stop_reason, reply_len = text.len(), "Model replied");
    Ok(text)
}

// ── Implementation ─────────────────────────────────────────────────────────

impl AnthropicModelClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        if config.anthropic_api_key.is_empty() {
            return Err(PasaError::Config("ANTHROPIC_API_KEY is not set".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            api_key: config.anthropic_api_key.clone(),
            model: config.model.clone(),
            limiter: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
        })
    }

    /// One completion for a single user turn. Waits for a limiter permit and
    /// holds it until the reply body is read.
    async fn complete(&self, system: &str, prompt: &str, max_tokens: u32) -> Result<String> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| PasaError::Model(format!("request limiter closed: {e}")))?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            system,
            messages: [UserTurn {
                role: "user",
                content: prompt.trim(),
            }],
        };
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), max_tokens, "Calling model");

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| PasaError::Model(format!("model request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PasaError::Model(format!("model response unreadable: {e}")))?;
        if !status.is_success() {
            let excerpt: String = body.chars().take(500).collect();
            return Err(PasaError::Model(format!("model API returned {status}: {excerpt}")));
        }
        reply_text(&body)
    }

    /// Runs one request per prompt concurrently and returns the results in
    /// prompt order.
    async fn complete_all(
        &self,
        system: &'static str,
        prompts: &[String],
        max_tokens: u32,
    ) -> Vec<Result<String>> {
        let mut join_set = tokio::task::JoinSet::new();
        for (i, prompt) in prompts.iter().enumerate() {
            let client = self.clone();
            let prompt = prompt.clone();
            join_set.spawn(async move { (i, client.complete(system, &prompt, max_tokens).await) });
        }

        let mut results: Vec<Option<Result<String>>> = prompts.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((i, result)) => results[i] = Some(result),
                Err(join_err) => {
                    tracing::error!(error = %join_err, "Task panicked during batch request");
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(PasaError::Model("request task panicked".into()))))
            .collect()
    }
}

/// Reads a relevance score from a selector reply: a number in `[0, 1]`, or a
/// `True`/`False` decision.
pub fn parse_score(reply: &str) -> Option<f64> {
    let trimmed = reply.trim();
    let first = trimmed
        .split(|c: char| c.is_whitespace() || c == ',')
        .next()
        .unwrap_or_default();
    if let Ok(value) = first.trim_end_matches('.').parse::<f64>() {
        if value.is_finite() {
            return Some(value.clamp(0.0, 1.0));
        }
    }

    let lower = trimmed.to_lowercase();
    match (lower.find("true"), lower.find("false")) {
        (Some(t), Some(f)) => Some(if t < f { 1.0 } else { 0.0 }),
        (Some(_), None) => Some(1.0),
        (None, Some(_)) => Some(0.0),
        (None, None) => None,
    }
}

#[async_trait]
impl ModelClient for AnthropicModelClient {
    async fn plan(&self, prompt: &str) -> Result<String> {
        tracing::info!(model = %self.model, "Requesting query plan");
        self.complete(CRAWLER_SYSTEM, prompt, MAX_TOKENS).await
    }

    async fn select_sections(&self, prompts: &[String]) -> Result<Vec<String>> {
        if prompts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!(count = prompts.len(), "Starting batch section selection");

        let results = self.complete_all(CRAWLER_SYSTEM, prompts, MAX_TOKENS).await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed == prompts.len() {
            return Err(PasaError::Model(format!(
                "All {failed} section-selection requests failed"
            )));
        }
        if failed > 0 {
            tracing::warn!(
                succeeded = prompts.len() - failed,
                failed,
                "Batch section selection completed with partial failures"
            );
        }

        // A failed request reads as a reply without directives.
        Ok(results.into_iter().map(|r| r.unwrap_or_default()).collect())
    }

    async fn score(&self, prompts: &[String]) -> Result<Vec<f64>> {
        if prompts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!(count = prompts.len(), "Starting batch scoring");

        let results = self.complete_all(SELECTOR_SYSTEM, prompts, SCORE_MAX_TOKENS).await;
        if results.iter().all(|r| r.is_err()) {
            return Err(PasaError::Model(format!(
                "All {} scoring requests failed",
                prompts.len()
            )));
        }

        Ok(results
            .into_iter()
            .enumerate()
            .map(|(i, result)| match result {
                Ok(reply) => parse_score(&reply).unwrap_or_else(|| {
                    tracing::warn!(index = i, reply = %reply, "Unparseable score, using 0");
                    0.0
                }),
                Err(e) => {
                    tracing::warn!(index = i, error = %e, "Scoring request failed, using 0");
                    0.0
                }
            })
            .collect())
    }
}
