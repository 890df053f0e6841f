//! Per-message tracing span with run id, message type and latency.

use std::time::Instant;

use tracing::{error, info, info_span, warn};

use super::{Mod, Next};
use crate::context::Context;
use crate::error::Result;
use crate::message::Message;

/// Opens an `info` span around the rest of the chain and logs the outcome.
///
/// Put it first so the span covers every other mod.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trace;

impl Mod for Trace {
    fn call(&self, message: &mut Message, context: &mut Context, next: Next<'_>) -> Result<Message> {
        let span = info_span!(
            "message",
            run_id = message.metadata.run_id,
            node_id = context.node_id,
            message_type = %message.metadata.message_type
        );
        let _guard = span.enter();
        let start = Instant::now();

        let result = next.run(message, context);

        let latency_us = start.elapsed().as_micros() as u64;
        match &result {
            Ok(reply) => match &reply.error {
                Some(err) => warn!(latency_us, code = ?err.code, reason = %err.reason, "error reply"),
                None => info!(latency_us, "message handled"),
            },
            Err(e) => error!(latency_us, "handler failed: {e}"),
        }
        result
    }
}
