//! Message-type registry of composed handlers.
//!
//! One handler per message type. Exact-match lookup, no fallback from
//! `train.custom` to `train`. Handlers are composed with their mods when they
//! are registered, so dispatch is one map lookup plus the chain itself.

use std::collections::HashMap;

use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::handler::{BoxedHandler, Handler};
use crate::message::{message_type, Message};
use crate::middleware::{compose, BoxedMod};

const CATEGORIES: [&str; 3] = [message_type::TRAIN, message_type::EVALUATE, message_type::QUERY];

/// The client application.
///
/// App-level mods wrap every handler and sit outside the handler's own mods:
///
/// ```text
/// ClientApp::with_mods([a1, a2]).on_with("train", train, [f1])
///
///   a1 ──► a2 ──► f1 ──► train
/// ```
///
/// Registrations chain, like a router:
///
/// ```rust
/// use sepal::{handler_fn, ClientApp, Context, Message, RecordDict};
///
/// fn train(msg: &mut Message, _ctx: &mut Context) -> sepal::Result<Message> {
///     Ok(msg.reply(RecordDict::new()))
/// }
///
/// let app = ClientApp::new()
///     .train(handler_fn(train))
///     .on("query.stats", handler_fn(train));
/// # let _ = app;
/// ```
pub struct ClientApp {
    mods: Vec<BoxedMod>,
    handlers: HashMap<String, BoxedHandler>,
}

impl ClientApp {
    pub fn new() -> Self {
        Self::with_mods(Vec::new())
    }

    /// An app whose handlers are all wrapped in `mods`, first mod outermost.
    pub fn with_mods(mods: impl IntoIterator<Item = BoxedMod>) -> Self {
        Self { mods: mods.into_iter().collect(), handlers: HashMap::new() }
    }

    /// Registers the default `train` handler.
    pub fn train(self, handler: impl Handler) -> Self {
        self.on(message_type::TRAIN, handler)
    }

    /// Registers the default `evaluate` handler.
    pub fn evaluate(self, handler: impl Handler) -> Self {
        self.on(message_type::EVALUATE, handler)
    }

    /// Registers the default `query` handler.
    pub fn query(self, handler: impl Handler) -> Self {
        self.on(message_type::QUERY, handler)
    }

    /// Registers `handler` for `message_type` (`category` or `category.action`).
    ///
    /// # Panics
    ///
    /// Panics if the message type is invalid or already registered.
    pub fn on(self, message_type: &str, handler: impl Handler) -> Self {
        self.on_with(message_type, handler, Vec::new())
    }

    /// Like [`on`](Self::on), with mods that wrap only this handler.
    pub fn on_with(
        mut self,
        message_type: &str,
        handler: impl Handler,
        mods: impl IntoIterator<Item = BoxedMod>,
    ) -> Self {
        if let Err(e) = validate_message_type(message_type) {
            panic!("cannot register handler: {e}");
        }
        if self.handlers.contains_key(message_type) {
            panic!("handler for `{message_type}` registered twice");
        }

        let chain: Vec<BoxedMod> = self.mods.iter().cloned().chain(mods).collect();
        let composed = compose(handler.boxed(), &chain);
        self.handlers.insert(message_type.to_owned(), composed);
        self
    }

    /// Registered message types, in no particular order.
    pub fn message_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub(crate) fn lookup(&self, message_type: &str) -> Result<&BoxedHandler> {
        validate_message_type(message_type)?;
        self.handlers
            .get(message_type)
            .ok_or_else(|| Error::UnknownMessageType(message_type.to_owned()))
    }
}

impl Default for ClientApp {
    fn default() -> Self { Self::new() }
}

impl Handler for ClientApp {
    /// Dispatches on `message.metadata.message_type`.
    fn call(&self, message: &mut Message, context: &mut Context) -> Result<Message> {
        let handler = self.lookup(message.message_type())?;
        debug!(message_type = %message.metadata.message_type, run_id = message.metadata.run_id, "dispatching");
        handler.call(message, context)
    }
}

/// Checks `category` or `category.action` with an identifier-like action.
pub fn validate_message_type(message_type: &str) -> Result<()> {
    let invalid = || Error::InvalidMessageType(message_type.to_owned());
    let (category, action) = match message_type.split_once('.') {
        Some((category, action)) => (category, Some(action)),
        None => (message_type, None),
    };

    if !CATEGORIES.contains(&category) {
        return Err(invalid());
    }
    if let Some(action) = action {
        let mut chars = action.chars();
        let head_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid());
        }
    }
    Ok(())
}
