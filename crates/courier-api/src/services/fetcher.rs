//! Attachment retrieval from the messaging platform's content endpoint.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

/// Characters left as-is in a path segment (RFC 3986 unreserved).
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Raw attachment bytes with the declared content type (parameters stripped).
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("content request timed out")]
    Timeout,

    #[error("content request failed: {0}")]
    Transport(String),

    #[error("content endpoint returned status {status}")]
    Status { status: u16 },

    #[error("failed to read content body: {0}")]
    Body(String),
}

impl FetchError {
    /// Short reason for structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Body(_) => "body",
        }
    }

    fn from_reqwest(err: reqwest::Error, reading_body: bool) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if reading_body {
            FetchError::Body(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Source of attachment bytes, keyed by platform message identifier.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    async fn fetch(&self, message_id: &str) -> Result<FetchedContent, FetchError>;
}

/// Client for `GET {base}/v2/bot/message/{id}/content`.
#[derive(Clone)]
pub struct LineContentClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl LineContentClient {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn content_url(&self, message_id: &str) -> String {
        format!(
            "{}/v2/bot/message/{}/content",
            self.base_url,
            utf8_percent_encode(message_id, PATH_SEGMENT)
        )
    }
}

#[async_trait]
impl AttachmentSource for LineContentClient {
    async fn fetch(&self, message_id: &str) -> Result<FetchedContent, FetchError> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .get(self.content_url(message_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, false))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_string())
            .filter(|ct| !ct.is_empty());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(e, true))?;

        tracing::debug!(
            message_id = %message_id,
            content_type = ?content_type,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Fetched message content"
        );

        Ok(FetchedContent {
            bytes,
            content_type,
        })
    }
}
