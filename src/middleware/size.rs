//! Logs the encoded size of message content in both directions.

use tracing::{info, warn};

use super::{Mod, Next};
use crate::context::Context;
use crate::error::Result;
use crate::message::Message;
use crate::record::RecordDict;

/// Size in bytes of `content` in its JSON wire form.
pub fn encoded_len(content: &RecordDict) -> Result<usize> {
    Ok(serde_json::to_vec(content)?.len())
}

/// Logs inbound and outbound content sizes at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageSize;

impl MessageSize {
    fn log(direction: &'static str, content: &RecordDict) {
        match encoded_len(content) {
            Ok(bytes) => info!(direction, bytes, "message size"),
            Err(e) => warn!(direction, "could not measure message: {e}"),
        }
    }
}

impl Mod for MessageSize {
    fn call(&self, message: &mut Message, context: &mut Context, next: Next<'_>) -> Result<Message> {
        Self::log("inbound", &message.content);
        let reply = next.run(message, context)?;
        Self::log("outbound", &reply.content);
        Ok(reply)
    }
}
