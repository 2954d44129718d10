//! Gemini Provider - Implementation of GenerationProvider for Google's
//! Gemini API.
//!
//! Single-shot calls use `:generateContent`; streaming chat uses
//! `:streamGenerateContent?alt=sse`, which delivers one JSON response
//! object per `data:` line.
//!
//! # Configuration
//!
//! ```ignore
//! let config = GeminiConfig::new(api_key)
//!     .with_model("gemini-2.0-flash")
//!     .with_timeout(Duration::from_secs(60));
//!
//! let provider = GeminiProvider::new(config);
//! ```

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{ChatMessage, ChatRole, FragmentStream, GenerationError, GenerationProvider};

/// Configuration for the Gemini provider.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key, passed as the `key` query parameter.
    api_key: Secret<String>,
    /// Model to use (e.g. "gemini-2.0-flash").
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum tokens to generate per reply.
    pub max_output_tokens: u32,
}

impl GeminiConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(60),
            max_output_tokens: 2048,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum output tokens.
    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = max;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Gemini API provider implementation.
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider with the given configuration.
    pub fn new(config: GeminiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Builds the URL for a model method (`generateContent` etc).
    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            method
        )
    }

    /// Converts history plus the new message to Gemini `contents`.
    ///
    /// Assistant-authored turns become role `model`, everything else
    /// role `user`, order preserved.
    fn to_contents(history: &[ChatMessage], new_message: &str) -> Vec<Content> {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|msg| Content {
                role: Some(wire_role(msg.role).to_string()),
                parts: vec![Part {
                    text: msg.content.clone(),
                }],
            })
            .collect();

        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: new_message.to_string(),
            }],
        });

        contents
    }

    /// Sends a request body to a model method.
    async fn send_request(
        &self,
        method: &str,
        query: &[(&str, &str)],
        body: &GenerateRequest,
    ) -> Result<Response, GenerationError> {
        let mut params: Vec<(&str, &str)> = vec![("key", self.config.api_key())];
        params.extend_from_slice(query);

        self.client
            .post(self.method_url(method))
            .query(&params)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    GenerationError::network(format!("connection failed: {e}"))
                } else {
                    GenerationError::network(e.to_string())
                }
            })
    }

    /// Maps a non-success response to a GenerationError.
    async fn handle_response_status(
        &self,
        response: Response,
    ) -> Result<Response, GenerationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(GenerationError::from_status(status.as_u16(), body))
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    async fn generate_once(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                max_output_tokens: self.config.max_output_tokens,
            }),
        };

        let response = self.send_request("generateContent", &[], &request).await?;
        let response = self.handle_response_status(response).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::parse(format!("failed to parse response: {e}")))?;

        Ok(candidate_text(&body))
    }

    async fn stream_chat(
        &self,
        system_instruction: &str,
        history: &[ChatMessage],
        new_message: &str,
    ) -> Result<FragmentStream, GenerationError> {
        let request = GenerateRequest {
            contents: Self::to_contents(history, new_message),
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            }),
            generation_config: Some(GenerationConfig {
                max_output_tokens: self.config.max_output_tokens,
            }),
        };

        let response = self
            .send_request("streamGenerateContent", &[("alt", "sse")], &request)
            .await?;
        let response = self.handle_response_status(response).await?;

        // Parse the SSE byte stream into text fragments. Lines can be
        // split across network chunks, so a carry buffer accumulates
        // until a full line is available.
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| GenerationError::network(format!("stream error: {e}"))))
            .scan(String::new(), |buffer, chunk| {
                let fragments = match chunk {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        drain_sse_lines(buffer)
                    }
                    Err(e) => vec![Err(e)],
                };
                future::ready(Some(fragments))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }
}

/// Maps a port role onto Gemini's role vocabulary.
fn wire_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

/// Drains complete SSE lines from the buffer, parsing `data:` payloads
/// into text fragments. Incomplete trailing lines stay in the buffer.
fn drain_sse_lines(buffer: &mut String) -> Vec<Result<String, GenerationError>> {
    let Some(last_newline) = buffer.rfind('\n') else {
        return Vec::new();
    };
    let complete: String = buffer.drain(..=last_newline).collect();

    let mut fragments = Vec::new();
    for line in complete.lines() {
        let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
            continue;
        };
        fragments.extend(parse_stream_data(data));
    }
    fragments
}

/// Parses one streamed response object into zero or more fragments.
fn parse_stream_data(data: &str) -> Option<Result<String, GenerationError>> {
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamPayload>(data) {
        Ok(StreamPayload::Chunk(chunk)) => {
            let text = candidate_text(&chunk);
            if text.is_empty() {
                None
            } else {
                Some(Ok(text))
            }
        }
        Ok(StreamPayload::Error { error }) => Some(Err(GenerationError::unavailable(
            error.message.unwrap_or_else(|| "stream error".to_string()),
        ))),
        Err(e) => Some(Err(GenerationError::parse(format!(
            "unparseable stream chunk: {e}"
        )))),
    }
}

/// Joins the text parts of the first candidate.
fn candidate_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

// ----- Gemini API Types -----

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

/// A streamed `data:` payload: either a response chunk or an error.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StreamPayload {
    Error { error: StreamErrorContent },
    Chunk(GenerateResponse),
}

#[derive(Debug, Deserialize)]
struct StreamErrorContent {
    message: Option<String>,
}
