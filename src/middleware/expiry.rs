//! Drops messages whose time-to-live has run out.

use tracing::warn;

use super::{Mod, Next};
use crate::context::Context;
use crate::error::Result;
use crate::message::{self, ErrorCode, Message};

/// Filters expired messages.
///
/// A message is expired when `created_at + ttl` lies in the past. The rest of
/// the chain does not run; the reply is an empty error reply with
/// [`ErrorCode::MessageUnavailable`].
#[derive(Debug, Clone, Copy)]
pub struct Expiry {
    clock: fn() -> f64,
}

impl Expiry {
    pub fn new() -> Self {
        Self { clock: message::now }
    }

    /// Uses `clock` (unix seconds) instead of the system clock.
    pub fn with_clock(clock: fn() -> f64) -> Self {
        Self { clock }
    }
}

impl Default for Expiry {
    fn default() -> Self { Self::new() }
}

impl Mod for Expiry {
    fn call(&self, message: &mut Message, context: &mut Context, next: Next<'_>) -> Result<Message> {
        let now = (self.clock)();
        if message.metadata.is_expired_at(now) {
            let expired_for = now - message.metadata.expires_at();
            warn!(run_id = message.metadata.run_id, expired_for, "dropping expired message");
            return Ok(message.error_reply(
                ErrorCode::MessageUnavailable,
                format!("message expired {expired_for:.3}s ago"),
            ));
        }
        next.run(message, context)
    }
}
