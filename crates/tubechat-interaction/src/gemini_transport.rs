//! GeminiTransport - streams responses from the Gemini REST API.
//!
//! Calls `streamGenerateContent` with `alt=sse` and forwards the text of
//! every decoded frame to the chunk sink as it arrives. The API key travels
//! in a request header so it never appears in URLs or error text.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tubechat_core::config::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiConfig};
use tubechat_core::{ChunkSink, CombinedContext, StreamFault, StreamTransport};

use crate::prompt::build_prompt;
use crate::sse::SseDecoder;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Chunk delivered in place of a response when no API key is configured.
pub const MISSING_API_KEY_MESSAGE: &str = "Gemini API key is not configured. Set GEMINI_API_KEY or add api_key under [gemini] in config.toml.";

/// Transport implementation that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiTransport {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiTransport {
    /// Creates a transport for the default model. A `None` or blank key is
    /// reported inline on every request.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self::new(config.api_key.clone())
            .with_model(config.model.clone())
            .with_base_url(config.base_url.clone())
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replaces the HTTP client, e.g. to set timeouts or proxy rules.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{model}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            model = self.model,
        )
    }
}

#[async_trait]
impl StreamTransport for GeminiTransport {
    async fn start_stream(
        &self,
        context: &CombinedContext,
        question: &str,
        sink: ChunkSink,
    ) -> Result<(), StreamFault> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("[GeminiTransport] No API key configured; replying inline");
            sink.push(MISSING_API_KEY_MESSAGE);
            return Ok(());
        };

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: build_prompt(context, question),
                }],
            }],
        };

        tracing::debug!(
            model = %self.model,
            composite_id = %context.composite_id,
            "[GeminiTransport] Sending streamGenerateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                StreamFault::network(format!("Gemini API request failed: {}", err.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();
        while let Some(bytes) = body.next().await {
            let bytes = bytes.map_err(|err| {
                StreamFault::network(format!("Gemini stream interrupted: {}", err.without_url()))
            })?;
            for frame in decoder.feed(&bytes) {
                forward_frame(&frame, &sink)?;
            }
        }
        if let Some(frame) = decoder.finish() {
            forward_frame(&frame, &sink)?;
        }

        tracing::debug!("[GeminiTransport] Stream finished");
        Ok(())
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

/// One SSE frame: either a partial response or an error object.
#[derive(Deserialize)]
struct StreamFrame {
    candidates: Option<Vec<Candidate>>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

impl ErrorBody {
    fn describe(self, fallback: &str) -> String {
        let status_text = self.status.unwrap_or_default();
        let message = self.message.unwrap_or_else(|| fallback.to_string());
        if status_text.is_empty() {
            message
        } else {
            format!("{status_text}: {message}")
        }
    }
}

/// Pushes the text parts of one frame to `sink`.
fn forward_frame(frame: &str, sink: &ChunkSink) -> Result<(), StreamFault> {
    for text in frame_texts(frame)? {
        if !sink.push(text) {
            return Err(StreamFault::cancelled());
        }
    }
    Ok(())
}

/// Extracts the text parts of the first candidate, in order.
fn frame_texts(frame: &str) -> Result<Vec<String>, StreamFault> {
    let parsed: StreamFrame = serde_json::from_str(frame)
        .map_err(|err| StreamFault::decode(format!("Malformed Gemini stream frame: {err}")))?;

    if let Some(error) = parsed.error {
        return Err(match error.code {
            Some(code) => StreamFault::http(code, error.describe(frame)),
            None => StreamFault::other(error.describe(frame)),
        });
    }

    Ok(parsed
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default())
}

fn map_http_error(status: StatusCode, body: &str) -> StreamFault {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| wrapper.error.describe(body))
        .unwrap_or_else(|_| body.to_string());
    StreamFault::http(status.as_u16(), message)
}
