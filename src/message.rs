//! The message envelope exchanged between a node and its client app.
//!
//! Requests and replies share one type. [`Metadata`] carries addressing and
//! lifetime information; `content` is the mutable, order-preserving payload
//! that mods and handlers append to.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::record::RecordDict;

/// Default time-to-live of a message, in seconds (12 hours).
pub const DEFAULT_TTL: f64 = 43_200.0;

/// Well-known message type categories.
pub mod message_type {
    pub const TRAIN: &str = "train";
    pub const EVALUATE: &str = "evaluate";
    pub const QUERY: &str = "query";
}

/// Current wall-clock time as unix seconds.
pub fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Addressing and lifetime information of a [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub run_id: u64,
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub group_id: String,
    pub src_node_id: u64,
    pub dst_node_id: u64,
    #[serde(default)]
    pub reply_to_message_id: String,
    pub created_at: f64,
    #[serde(default = "default_ttl")]
    pub ttl: f64,
    pub message_type: String,
}

fn default_ttl() -> f64 { DEFAULT_TTL }

impl Metadata {
    /// Metadata for a fresh message created now, with the default TTL.
    pub fn new(run_id: u64, src_node_id: u64, dst_node_id: u64, message_type: impl Into<String>) -> Self {
        Self {
            run_id,
            message_id: String::new(),
            group_id: String::new(),
            src_node_id,
            dst_node_id,
            reply_to_message_id: String::new(),
            created_at: now(),
            ttl: DEFAULT_TTL,
            message_type: message_type.into(),
        }
    }

    /// Unix time after which the message is no longer deliverable.
    pub fn expires_at(&self) -> f64 { self.created_at + self.ttl }

    pub fn is_expired_at(&self, at: f64) -> bool { self.expires_at() < at }
}

/// Why a reply carries no useful content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ErrorCode {
    Unknown = 0,
    LoadClientAppException = 1,
    ClientAppRaisedException = 2,
    MessageUnavailable = 3,
    ReplyMessageUnavailable = 4,
}

impl From<ErrorCode> for u8 {
    fn from(code: ErrorCode) -> Self { code as u8 }
}

impl TryFrom<u8> for ErrorCode {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => Self::Unknown,
            1 => Self::LoadClientAppException,
            2 => Self::ClientAppRaisedException,
            3 => Self::MessageUnavailable,
            4 => Self::ReplyMessageUnavailable,
            other => return Err(format!("unknown error code {other}")),
        })
    }
}

/// Error payload of a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageError {
    pub code: ErrorCode,
    pub reason: String,
}

/// A request or a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub metadata: Metadata,
    #[serde(default)]
    pub content: RecordDict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MessageError>,
}

impl Message {
    /// A message with the given metadata, copied as-is, and content.
    pub fn with_metadata(metadata: Metadata, content: RecordDict) -> Self {
        Self { metadata, content, error: None }
    }

    pub fn message_type(&self) -> &str { &self.metadata.message_type }

    pub fn has_error(&self) -> bool { self.error.is_some() }

    /// Builds a reply addressed back to the sender of `self`.
    ///
    /// Source and destination are swapped, `reply_to_message_id` points at this
    /// message, and the TTL is whatever remains of this message's lifetime.
    pub fn reply(&self, content: RecordDict) -> Self {
        let created_at = now();
        let ttl = (self.metadata.expires_at() - created_at).max(0.0);
        Self {
            metadata: Metadata {
                run_id: self.metadata.run_id,
                message_id: String::new(),
                group_id: self.metadata.group_id.clone(),
                src_node_id: self.metadata.dst_node_id,
                dst_node_id: self.metadata.src_node_id,
                reply_to_message_id: self.metadata.message_id.clone(),
                created_at,
                ttl,
                message_type: self.metadata.message_type.clone(),
            },
            content,
            error: None,
        }
    }

    /// Builds an empty reply carrying `code` and `reason`.
    pub fn error_reply(&self, code: ErrorCode, reason: impl Into<String>) -> Self {
        let mut reply = self.reply(RecordDict::new());
        reply.error = Some(MessageError { code, reason: reason.into() });
        reply
    }
}
