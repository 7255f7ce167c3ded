// src/client.rs
// One completion request per chunk, with bounded retry on throttling.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chunker::Chunk;
use crate::config::Config;
use crate::error::AnalysisError;
use crate::prompt::{build_prompt, SYSTEM_PROMPT};

/// Throttled requests are retried at most this many times before the
/// 429 is surfaced to the caller.
pub const MAX_THROTTLE_RETRIES: u32 = 3;
/// Extra wait added on top of the server-suggested throttle delay.
const THROTTLE_BUFFER_MS: u64 = 5000;
/// Wait used when the 429 body does not suggest a delay.
const DEFAULT_THROTTLE_WAIT_SECS: u64 = 10;

const MAX_COMPLETION_TOKENS: u32 = 512;

/// Shortest model output accepted as a real analysis.
pub const MIN_ANALYSIS_LENGTH: usize = 100;

static SUGGESTED_WAIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"try again in (\d+)\.").expect("valid regex"));

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of the chat-completions POST. Sampling parameters are fixed.
#[derive(Debug, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Raw transport outcome: HTTP status plus the body text, before any
/// interpretation by the retry loop.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

/// Transport seam for the completion endpoint. The production
/// implementation talks HTTP; tests script responses.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn send(&self, request: &CompletionRequest) -> Result<ApiResponse, AnalysisError>;
}

/// reqwest-backed transport for the chat-completions endpoint.
pub struct HttpCompletionApi {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpCompletionApi {
    pub fn new(url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        }
    }
}

#[async_trait]
impl CompletionApi for HttpCompletionApi {
    async fn send(&self, request: &CompletionRequest) -> Result<ApiResponse, AnalysisError> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok(ApiResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
        })
    }
}

/// Accepts or rejects the model's text before it enters the report.
///
/// The refusal markers flag boilerplate deflections instead of a real
/// analysis. The historical default marker is "safe", which also rejects
/// genuine analyses that discuss safety, so callers may override the list.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    pub min_length: usize,
    pub refusal_markers: Vec<String>,
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self {
            min_length: MIN_ANALYSIS_LENGTH,
            refusal_markers: vec!["safe".to_string()],
        }
    }
}

impl ResponseValidator {
    pub fn validate(&self, analysis: &str) -> Result<(), String> {
        if analysis.is_empty() {
            return Err("empty response".to_string());
        }
        if analysis.len() < self.min_length {
            return Err(format!(
                "response too short ({} chars, minimum {})",
                analysis.len(),
                self.min_length
            ));
        }
        let lowered = analysis.to_lowercase();
        for marker in &self.refusal_markers {
            if lowered.contains(&marker.to_lowercase()) {
                return Err(format!("response contains refusal marker {marker:?}"));
            }
        }
        Ok(())
    }
}

/// Seconds the server asked us to wait, extracted from the 429 error body.
fn suggested_wait_secs(body: &str) -> u64 {
    SUGGESTED_WAIT_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(DEFAULT_THROTTLE_WAIT_SECS)
}

/// Issues one completion request per chunk and validates the result.
pub struct AnalysisClient {
    api: Box<dyn CompletionApi>,
    model: String,
    validator: ResponseValidator,
}

impl AnalysisClient {
    pub fn new(config: &Config) -> Self {
        Self::with_api(
            Box::new(HttpCompletionApi::new(
                config.api_url.clone(),
                config.api_key.clone(),
            )),
            config.model.clone(),
        )
    }

    pub fn with_api(api: Box<dyn CompletionApi>, model: String) -> Self {
        Self {
            api,
            model,
            validator: ResponseValidator::default(),
        }
    }

    pub fn with_validator(mut self, validator: ResponseValidator) -> Self {
        self.validator = validator;
        self
    }

    fn build_request(&self, chunk: &Chunk) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(chunk),
                },
            ],
            temperature: 0.7,
            max_tokens: MAX_COMPLETION_TOKENS,
            top_p: 0.9,
            frequency_penalty: 0.1,
            presence_penalty: 0.1,
        }
    }

    /// Analyzes one chunk. Throttling (HTTP 429) is retried up to
    /// [`MAX_THROTTLE_RETRIES`] times with a server-suggested wait; any
    /// other non-success status fails immediately. A response failing
    /// validation is never retried here.
    pub async fn analyze(&self, chunk: &Chunk) -> Result<String, AnalysisError> {
        debug!(
            chunk_index = chunk.index,
            chunk_len = chunk.text.len(),
            "Analyzing chunk"
        );
        let request = self.build_request(chunk);

        let mut throttled_retries = 0u32;
        loop {
            let response = self.api.send(&request).await?;

            if response.status == 429 {
                if throttled_retries >= MAX_THROTTLE_RETRIES {
                    return Err(AnalysisError::RetriesExhausted {
                        attempts: throttled_retries + 1,
                        status_text: response.status_text,
                        body: response.body,
                    });
                }
                let wait_ms = suggested_wait_secs(&response.body) * 1000 + THROTTLE_BUFFER_MS;
                warn!(wait_ms, throttled_retries, "Rate limit hit, waiting before retry");
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                throttled_retries += 1;
                continue;
            }

            if !(200..300).contains(&response.status) {
                return Err(AnalysisError::RemoteApi {
                    status: response.status,
                    status_text: response.status_text,
                    body: response.body,
                });
            }

            let parsed: CompletionResponse =
                serde_json::from_str(&response.body).map_err(|e| {
                    AnalysisError::InvalidAnalysis {
                        reason: format!("malformed completion body: {e}"),
                    }
                })?;
            let analysis = parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| AnalysisError::InvalidAnalysis {
                    reason: "completion contained no choices".to_string(),
                })?;

            self.validator
                .validate(&analysis)
                .map_err(|reason| AnalysisError::InvalidAnalysis { reason })?;

            info!(chunk_index = chunk.index, "Chunk analysis completed");
            return Ok(analysis);
        }
    }
}
