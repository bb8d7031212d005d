//! Anthropic Messages API provider (feature `anthropic`).
//!
//! Plain completions post once and read the JSON body. Streaming sets
//! `"stream": true` and decodes the server-sent events, yielding each
//! `text_delta` as a fragment.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, CompletionRequest, LLMProvider, ProviderError, TextStream};
use crate::constants::{LLM_PROMPT_BYTES_MAX, LLM_REPLY_TOKENS_MAX, LLM_RESPONSE_BYTES_MAX};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Model used unless [`AnthropicProvider::with_model`] says otherwise.
pub const ANTHROPIC_MODEL_DEFAULT: &str = "claude-sonnet-4-20250514";

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: usize,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    content: Vec<ReplyBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplyBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl From<ApiError> for ProviderError {
    fn from(error: ApiError) -> Self {
        match error.kind.as_str() {
            "authentication_error" | "permission_error" => Self::Unauthorized,
            "rate_limit_error" => Self::RateLimited(None),
            "overloaded_error" | "api_error" => Self::unavailable(error.message),
            "invalid_request_error" | "request_too_large" => Self::rejected(error.message),
            _ => Self::malformed(format!("{}: {}", error.kind, error.message)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SseData {
    ContentBlockDelta { delta: Delta },
    Error { error: ApiError },
    #[serde(other)]
    Ignored,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Ignored,
}

/// Splits a byte stream into SSE events on blank lines.
///
/// Works on bytes so a chunk boundary inside a multi-byte character is
/// harmless; an event is only decoded once it is complete.
#[derive(Debug, Default)]
struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Next complete event, decoded to the text it carries (possibly none).
    fn next_event(&mut self) -> Option<Result<Option<String>, ProviderError>> {
        let end = self.pending.windows(2).position(|w| w == b"\n\n")?;
        let raw: Vec<u8> = self.pending.drain(..end + 2).collect();
        Some(decode_event(&String::from_utf8_lossy(&raw)))
    }
}

fn decode_event(event: &str) -> Result<Option<String>, ProviderError> {
    let mut text = String::new();
    for data in event.lines().filter_map(|line| line.strip_prefix("data:")) {
        match serde_json::from_str::<SseData>(data.trim()) {
            Ok(SseData::ContentBlockDelta {
                delta: Delta::TextDelta { text: fragment },
            }) => text.push_str(&fragment),
            Ok(SseData::Error { error }) => return Err(error.into()),
            // Pings, block boundaries and anything unparseable carry no text.
            Ok(_) | Err(_) => {}
        }
    }
    Ok(if text.is_empty() { None } else { Some(text) })
}

fn status_error(status: StatusCode, headers: &HeaderMap, body: &str) -> ProviderError {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let error = ProviderError::from(envelope.error);
        if matches!(error, ProviderError::RateLimited(None)) {
            return ProviderError::RateLimited(retry_after_secs(headers));
        }
        return error;
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(retry_after_secs(headers)),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderError::Timeout,
        s if s.is_server_error() => ProviderError::unavailable(format!("HTTP {s}")),
        s => ProviderError::malformed(format!("HTTP {s}: {body}")),
    }
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn transport_error(error: &reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::connection(error.to_string())
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Claude over the Messages API.
///
/// ```rust,no_run
/// use nori_memory::llm::{AnthropicProvider, CompletionRequest, LLMProvider};
///
/// # async fn demo() -> Result<(), nori_memory::llm::ProviderError> {
/// let provider = AnthropicProvider::new(std::env::var("ANTHROPIC_API_KEY").unwrap_or_default());
/// let reply = provider.complete(&CompletionRequest::new("hi")).await?;
/// println!("{reply}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl AnthropicProvider {
    /// Provider using [`ANTHROPIC_MODEL_DEFAULT`].
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: ANTHROPIC_MODEL_DEFAULT.to_string(),
            url: MESSAGES_URL.to_string(),
        }
    }

    /// Use another model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Post somewhere other than the public endpoint, e.g. a proxy.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Model id sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest, stream: bool) -> MessagesBody<'a> {
        MessagesBody {
            model: &self.model,
            max_tokens: request.max_tokens.unwrap_or(LLM_REPLY_TOKENS_MAX),
            messages: &request.messages,
            system: request.system.as_deref(),
            temperature: request.temperature,
            stream,
        }
    }

    async fn post(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        debug_assert!(request.prompt_bytes() <= LLM_PROMPT_BYTES_MAX);

        let response = self
            .http
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(request, stream))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let error = status_error(status, &headers, &body);
        tracing::warn!(%status, error = %error, "anthropic request failed");
        Err(error)
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    #[tracing::instrument(skip_all, fields(model = %self.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let reply: MessagesReply = self
            .post(request, false)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::malformed(e.to_string()))?;

        let text: String = reply
            .content
            .into_iter()
            .filter_map(|block| match block {
                ReplyBlock::Text { text } => Some(text),
                ReplyBlock::Other => None,
            })
            .collect();

        debug_assert!(text.len() <= LLM_RESPONSE_BYTES_MAX);
        Ok(text)
    }

    fn complete_stream<'a>(&'a self, request: &'a CompletionRequest) -> TextStream<'a> {
        Box::pin(async_stream::stream! {
            let response = match self.post(request, true).await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut chunks = response.bytes_stream();
            let mut decoder = SseDecoder::default();

            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(bytes) => decoder.push(&bytes),
                    Err(e) => {
                        yield Err(transport_error(&e));
                        return;
                    }
                }
                while let Some(event) = decoder.next_event() {
                    match event {
                        Ok(Some(text)) => yield Ok(text),
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn is_simulation(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    const DELTA: &str = "event: content_block_delta\n\
        data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi Sam\"}}\n\n";

    #[test]
    fn test_body_for_coaching_turn() {
        let provider = AnthropicProvider::new("key").with_model("claude-test");
        let request = CompletionRequest::chat(vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("How much weight are you looking to lose?"),
            ChatMessage::user("20 lbs"),
        ])
        .with_system("You are a coach");

        let body = serde_json::to_value(provider.body(&request, true)).unwrap();

        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], LLM_REPLY_TOKENS_MAX);
        assert_eq!(body["system"], "You are a coach");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["messages"][2]["content"], "20 lbs");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_body_without_stream_or_system() {
        let provider = AnthropicProvider::new("key");
        let request = CompletionRequest::new("Analyze this exchange").with_max_tokens(500);

        let body = serde_json::to_value(provider.body(&request, false)).unwrap();

        assert_eq!(body["model"], ANTHROPIC_MODEL_DEFAULT);
        assert_eq!(body["max_tokens"], 500);
        assert!(body.get("stream").is_none());
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::default();
        let (head, tail) = DELTA.as_bytes().split_at(40);

        decoder.push(head);
        assert!(decoder.next_event().is_none());

        decoder.push(tail);
        assert_eq!(decoder.next_event().unwrap().unwrap(), Some("Hi Sam".to_string()));
        assert!(decoder.next_event().is_none());
    }

    #[test]
    fn test_decoder_split_inside_character() {
        let event = DELTA.replace("Hi Sam", "caf\u{e9}");
        let bytes = event.as_bytes();
        let cut = event.find('\u{e9}').unwrap() + 1;
        let mut decoder = SseDecoder::default();

        decoder.push(&bytes[..cut]);
        decoder.push(&bytes[cut..]);

        assert_eq!(decoder.next_event().unwrap().unwrap(), Some("caf\u{e9}".to_string()));
    }

    #[test]
    fn test_decode_skips_non_text_events() {
        assert_eq!(decode_event("event: ping\ndata: {\"type\":\"ping\"}\n\n").unwrap(), None);
        assert_eq!(
            decode_event("event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n").unwrap(),
            None
        );
    }

    #[test]
    fn test_decode_error_event() {
        let event = "event: error\n\
            data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n";
        assert_eq!(decode_event(event), Err(ProviderError::unavailable("Overloaded")));
    }

    #[test]
    fn test_status_error_prefers_body() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"Bad prompt"}}"#;

        assert_eq!(
            status_error(StatusCode::BAD_REQUEST, &HeaderMap::new(), body),
            ProviderError::rejected("Bad prompt")
        );
    }

    #[test]
    fn test_status_error_without_body() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));

        assert_eq!(
            status_error(StatusCode::TOO_MANY_REQUESTS, &headers, ""),
            ProviderError::RateLimited(Some(12))
        );
        assert_eq!(
            status_error(StatusCode::GATEWAY_TIMEOUT, &HeaderMap::new(), "upstream timed out"),
            ProviderError::Timeout
        );
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, &HeaderMap::new(), "oops"),
            ProviderError::Unavailable(_)
        ));
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, &HeaderMap::new(), ""),
            ProviderError::Unauthorized
        );
    }
}
