//! OpenAI Responses API streaming client.
//!
//! The only request shape this system needs: one developer instruction block,
//! one user question, `stream: true`, and the `response.output_text.delta`
//! events decoded into plain text chunks.

use std::pin::Pin;
use std::task::Poll;

use anyhow::{Context as _, Result, anyhow};
use futures_util::Stream;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::providers::{
    CompletionClient, CompletionRequest, ProviderError, ProviderErrorKind, TokenStream,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const RESPONSES_PATH: &str = "/v1/responses";

/// Connection settings for the Responses endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub api_key: String,
}

impl OpenAiConfig {
    /// Builds a config from the environment.
    ///
    /// `OPENAI_API_KEY` is required. The base URL resolves from the explicit
    /// override, then `OPENAI_BASE_URL` (for test rigs or proxies), then the
    /// production endpoint.
    pub fn from_env(
        model: impl Into<String>,
        max_output_tokens: u32,
        base_url: Option<&str>,
    ) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY is not set; export it to reach the completion service")?;
        let base_url = base_url
            .map(str::to_string)
            .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            base_url,
            model: model.into(),
            max_output_tokens,
            api_key,
        })
    }
}

/// Streaming client for the Responses API.
pub struct OpenAiClient {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    /// Creates a new client.
    ///
    /// # Panics
    /// - In test builds, panics if `base_url` is the production API.
    /// - At runtime, panics if `SOTTO_BLOCK_REAL_API=1` and `base_url` is the
    ///   production API.
    ///
    /// This prevents tests from accidentally making real network requests;
    /// point `base_url` at a mock server instead.
    pub fn new(config: OpenAiConfig) -> Self {
        #[cfg(test)]
        assert!(
            config.base_url != DEFAULT_BASE_URL,
            "Tests must not use the production OpenAI API; set a mock base_url"
        );

        #[cfg(not(test))]
        if std::env::var("SOTTO_BLOCK_REAL_API").is_ok_and(|v| v == "1")
            && config.base_url == DEFAULT_BASE_URL
        {
            panic!(
                "SOTTO_BLOCK_REAL_API=1 but trying to use the production OpenAI API; \
                 set OPENAI_BASE_URL to a mock server"
            );
        }

        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

impl CompletionClient for OpenAiClient {
    fn open_token_stream(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'static, Result<TokenStream>> {
        let http = self.http.clone();
        let config = self.config.clone();
        Box::pin(async move { send_token_stream(http, config, request).await })
    }
}

async fn send_token_stream(
    http: reqwest::Client,
    config: OpenAiConfig,
    request: CompletionRequest,
) -> Result<TokenStream> {
    let body = RequestBody {
        model: config.model.clone(),
        stream: true,
        max_output_tokens: config.max_output_tokens,
        instructions: Some(request.instructions),
        input: vec![InputItem::user(format!("Question: {}", request.question))],
    };

    let url = format!("{}{}", config.base_url, RESPONSES_PATH);
    let response = http
        .post(&url)
        .bearer_auth(&config.api_key)
        .json(&body)
        .send()
        .await
        .map_err(classify_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        return Err(ProviderError::http_status(status.as_u16(), &error_body).into());
    }

    Ok(Box::pin(TokenSseParser::new(response.bytes_stream())))
}

fn classify_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::timeout(format!("Connection failed: {e}"))
    } else {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Network error: {e}"))
    }
}

#[derive(Debug, Serialize)]
struct RequestBody {
    model: String,
    stream: bool,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    input: Vec<InputItem>,
}

#[derive(Debug, Serialize)]
struct InputItem {
    #[serde(rename = "type")]
    item_type: String,
    role: String,
    content: Vec<InputContent>,
}

impl InputItem {
    fn user(text: String) -> Self {
        Self {
            item_type: "message".to_string(),
            role: "user".to_string(),
            content: vec![InputContent::InputText { text }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputContent {
    InputText { text: String },
}

/// What a single SSE event means to the token stream.
enum Mapped {
    Token(String),
    Failure(ProviderError),
    Ignore,
}

fn map_event(value: &Value) -> Mapped {
    let event_type = value.get("type").and_then(|v| v.as_str()).unwrap_or("");
    match event_type {
        "response.output_text.delta" | "response.refusal.delta" => {
            let delta = value.get("delta").and_then(|v| v.as_str()).unwrap_or("");
            if delta.is_empty() {
                Mapped::Ignore
            } else {
                Mapped::Token(delta.to_string())
            }
        }
        "response.failed" => {
            let error = value
                .get("response")
                .and_then(|r| r.get("error"))
                .cloned()
                .unwrap_or(Value::Null);
            let code = error.get("code").and_then(|v| v.as_str()).unwrap_or("failed");
            let message = error
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Response failed");
            Mapped::Failure(ProviderError::api_error(code, message))
        }
        "error" => {
            let code = value.get("code").and_then(|v| v.as_str()).unwrap_or("error");
            let message = value
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            Mapped::Failure(ProviderError::api_error(code, message))
        }
        // response.created, output_item lifecycle, completed, etc.
        _ => Mapped::Ignore,
    }
}

/// SSE decoder yielding answer text chunks.
struct TokenSseParser<S> {
    inner: S,
    buffer: Vec<u8>,
}

impl<S> TokenSseParser<S> {
    fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
        }
    }

    /// Pops complete SSE chunks off the buffer until one yields a token or a
    /// failure. Returns `None` when no complete chunk remains.
    fn try_next_token(&mut self) -> Option<Result<String>> {
        while let Some((pos, delim_len)) = find_double_newline(&self.buffer) {
            let chunk = self.buffer.drain(..pos).collect::<Vec<u8>>();
            self.buffer.drain(..delim_len);

            let chunk_text = String::from_utf8_lossy(&chunk);
            match parse_sse_data(&chunk_text) {
                Ok(Some(value)) => match map_event(&value) {
                    Mapped::Token(text) => return Some(Ok(text)),
                    Mapped::Failure(err) => return Some(Err(err.into())),
                    Mapped::Ignore => {}
                },
                Ok(None) => {}
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}

impl<S, E> Stream for TokenSseParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = Result<String>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(item) = this.try_next_token() {
                return Poll::Ready(Some(item));
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(anyhow!("Stream error: {e}"))));
                }
                Poll::Ready(None) => {
                    // Flush a trailing chunk that arrived without its blank line.
                    if this.buffer.iter().all(u8::is_ascii_whitespace) {
                        return Poll::Ready(None);
                    }
                    let rest = std::mem::take(&mut this.buffer);
                    let chunk_text = String::from_utf8_lossy(&rest);
                    return match parse_sse_data(&chunk_text) {
                        Ok(Some(value)) => match map_event(&value) {
                            Mapped::Token(text) => Poll::Ready(Some(Ok(text))),
                            Mapped::Failure(err) => Poll::Ready(Some(Err(err.into()))),
                            Mapped::Ignore => Poll::Ready(None),
                        },
                        Ok(None) => Poll::Ready(None),
                        Err(err) => Poll::Ready(Some(Err(err))),
                    };
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Finds the position of a double newline in the buffer.
/// Handles both LF (\n\n) and CRLF (\r\n\r\n) line endings.
/// Returns the position and the length of the delimiter (2 or 4 bytes).
fn find_double_newline(buffer: &[u8]) -> Option<(usize, usize)> {
    let crlf_pos = buffer.windows(4).position(|w| w == b"\r\n\r\n");
    let lf_pos = buffer.windows(2).position(|w| w == b"\n\n");

    match (crlf_pos, lf_pos) {
        (Some(c), Some(l)) => {
            if l <= c {
                Some((l, 2))
            } else {
                Some((c, 4))
            }
        }
        (Some(c), None) => Some((c, 4)),
        (None, Some(l)) => Some((l, 2)),
        (None, None) => None,
    }
}

fn parse_sse_data(chunk: &str) -> Result<Option<Value>> {
    let mut data_lines = Vec::new();
    for line in chunk.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim());
        }
    }
    if data_lines.is_empty() {
        return Ok(None);
    }
    let data = data_lines.join("\n");
    let trimmed = data.trim();
    if trimmed.is_empty() || trimmed == "[DONE]" {
        return Ok(None);
    }
    let value = serde_json::from_str::<Value>(trimmed)
        .map_err(|err| anyhow::Error::new(ProviderError::parse(format!("Invalid SSE JSON: {err}"))))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_find_double_newline_lf_and_crlf() {
        assert_eq!(find_double_newline(b"a\n\nb"), Some((1, 2)));
        assert_eq!(find_double_newline(b"a\r\n\r\nb"), Some((1, 4)));
        assert_eq!(find_double_newline(b"no delimiter"), None);
    }

    #[test]
    fn test_parse_sse_data_joins_data_lines() {
        let value = parse_sse_data("event: x\ndata: {\"type\":\n data: \"noop\"}")
            .unwrap()
            .unwrap();
        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("noop"));
    }

    #[test]
    fn test_parse_sse_data_skips_done_marker() {
        assert!(parse_sse_data("data: [DONE]").unwrap().is_none());
        assert!(parse_sse_data("event: ping").unwrap().is_none());
    }

    #[test]
    fn test_map_event_extracts_text_delta() {
        let value = json!({"type": "response.output_text.delta", "delta": "Hel"});
        match map_event(&value) {
            Mapped::Token(text) => assert_eq!(text, "Hel"),
            _ => panic!("expected token"),
        }
    }

    #[test]
    fn test_map_event_surfaces_stream_error() {
        let value = json!({"type": "error", "code": "overloaded", "message": "slow down"});
        match map_event(&value) {
            Mapped::Failure(err) => {
                assert_eq!(err.kind, ProviderErrorKind::ApiError);
                assert_eq!(err.message, "overloaded: slow down");
            }
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn test_map_event_ignores_lifecycle_events() {
        for event_type in [
            "response.created",
            "response.output_item.added",
            "response.output_item.done",
            "response.completed",
        ] {
            assert!(matches!(
                map_event(&json!({"type": event_type})),
                Mapped::Ignore
            ));
        }
    }
}
