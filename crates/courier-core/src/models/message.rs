//! Inbound webhook events and the media messages extracted from them.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Kind of user-sent attachment. Also used as the storage folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "file_kind", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Image,
    Video,
    Audio,
    File,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Audio => "audio",
            MessageKind::File => "file",
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MessageKind::Image),
            "video" => Ok(MessageKind::Video),
            "audio" => Ok(MessageKind::Audio),
            "file" => Ok(MessageKind::File),
            other => Err(other.to_string()),
        }
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Message payload as sent by the platform, before eligibility checks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "fileName", default)]
    pub file_name: Option<String>,
}

/// One entry of the webhook `events` list.
///
/// Entries that do not decode (wrong shape, unknown `type`) become `Unrecognized`
/// so that a single bad entry never invalidates its batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IncomingEvent {
    Message {
        #[serde(default)]
        message: Option<RawMessage>,
    },
    #[serde(other)]
    Unrecognized,
}

/// Why an event was not handed to the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotAMessage,
    MissingMessage,
    UnsupportedKind(String),
    MissingId,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SkipReason::NotAMessage => write!(f, "event is not a message"),
            SkipReason::MissingMessage => write!(f, "message event without payload"),
            SkipReason::UnsupportedKind(kind) => write!(f, "unsupported message kind '{}'", kind),
            SkipReason::MissingId => write!(f, "message has no identifier"),
        }
    }
}

impl IncomingEvent {
    /// Decode every entry of the `events` list of a webhook body.
    ///
    /// Returns an empty list when the body is not an object or has no `events` array.
    pub fn parse_batch(body: &serde_json::Value) -> Vec<IncomingEvent> {
        body.get("events")
            .and_then(|events| events.as_array())
            .map(|events| {
                events
                    .iter()
                    .map(|event| {
                        IncomingEvent::deserialize(event).unwrap_or(IncomingEvent::Unrecognized)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Extract the media message this event carries, if it is eligible for ingestion.
    pub fn media_message(&self) -> Result<MediaMessage, SkipReason> {
        let raw = match self {
            IncomingEvent::Message { message: Some(raw) } => raw,
            IncomingEvent::Message { message: None } => return Err(SkipReason::MissingMessage),
            IncomingEvent::Unrecognized => return Err(SkipReason::NotAMessage),
        };

        let kind = raw
            .kind
            .parse::<MessageKind>()
            .map_err(SkipReason::UnsupportedKind)?;

        let id = raw
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(SkipReason::MissingId)?;

        let file_name = match kind {
            MessageKind::File => raw
                .file_name
                .as_deref()
                .filter(|name| !name.trim().is_empty())
                .map(str::to_string),
            _ => None,
        };

        Ok(MediaMessage {
            id: id.to_string(),
            kind,
            file_name,
        })
    }
}

/// An eligible attachment notification. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMessage {
    pub id: String,
    pub kind: MessageKind,
    /// User-visible filename; only ever set for `MessageKind::File`.
    pub file_name: Option<String>,
}
