//! Completion-service transport.
//!
//! The pipeline only consumes a stream of answer token chunks; everything
//! about how those chunks are produced lives behind [`CompletionClient`].

pub mod openai;

use std::fmt;
use std::pin::Pin;

use anyhow::Result;
use futures_util::Stream;
use futures_util::future::BoxFuture;
use serde_json::Value;

pub use openai::{OpenAiClient, OpenAiConfig};

/// Async stream of answer text chunks, terminated by end-of-stream or an error.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// One completion request: the assembled instruction block plus the question.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System/developer instructions, including context documents and the
    /// recent-history rendering.
    pub instructions: String,
    /// The finalized spoken question.
    pub question: String,
}

/// A streaming completion backend.
///
/// Implementations must not buffer whole answers: each chunk is yielded as it
/// arrives so the display can stream. Returning an `Err` item mid-stream is a
/// provider failure; the stream must not be polled afterwards.
pub trait CompletionClient: Send + Sync {
    fn open_token_stream(&self, request: CompletionRequest) -> BoxFuture<'static, Result<TokenStream>>;
}

/// Categories of provider errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Connection timeout or request timeout
    Timeout,
    /// Failed to parse the response (JSON parse error, invalid SSE, etc.)
    Parse,
    /// API-level error event returned by the provider mid-stream
    ApiError,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::HttpStatus => write!(f, "http_status"),
            ProviderErrorKind::Timeout => write!(f, "timeout"),
            ProviderErrorKind::Parse => write!(f, "parse"),
            ProviderErrorKind::ApiError => write!(f, "api_error"),
        }
    }
}

/// Structured error from the provider with kind and details.
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Error category
    pub kind: ProviderErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g. raw error body)
    pub details: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, extracting the provider's message from a
    /// JSON error body when one is present.
    pub fn http_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}");
        let details = if body.is_empty() {
            None
        } else {
            if let Ok(json) = serde_json::from_str::<Value>(body)
                && let Some(error_obj) = json.get("error")
                && let Some(msg) = error_obj.get("message").and_then(|v| v.as_str())
            {
                return Self {
                    kind: ProviderErrorKind::HttpStatus,
                    message: format!("HTTP {status}: {msg}"),
                    details: Some(body.to_string()),
                };
            }
            Some(body.to_string())
        };
        Self {
            kind: ProviderErrorKind::HttpStatus,
            message,
            details,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Parse, message)
    }

    /// Creates an API error from a mid-stream error event.
    pub fn api_error(error_type: &str, message: &str) -> Self {
        Self {
            kind: ProviderErrorKind::ApiError,
            message: format!("{error_type}: {message}"),
            details: None,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}
