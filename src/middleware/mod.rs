//! Mods: interceptors wrapped around a handler.
//!
//! A mod sees every message on its way in and every reply on its way out, and
//! is the right place for cross-cutting concerns: tracing, size accounting,
//! expiry checks, counters kept in context state.
//!
//! # Execution order
//!
//! [`compose`] folds the mod list right-to-left around the terminal handler,
//! so the first mod is the outermost layer of the onion:
//!
//! ```text
//! compose(app, [m1, m2, m3])
//!
//!   m1 ──► m2 ──► m3 ──► app
//!   m1 ◄── m2 ◄── m3 ◄──┘
//! ```
//!
//! A mod that returns without running [`Next`] filters the message: nothing
//! inside it runs, and the mods outside it receive its reply as if it came
//! from deeper in the chain.
//!
//! # Running `next` at most once
//!
//! [`Next::run`] consumes the handle, and `Next` is neither `Clone` nor
//! `Copy`. Running the rest of the chain twice does not compile:
//!
//! ```rust,compile_fail
//! use sepal::middleware::mod_fn;
//!
//! let twice = mod_fn(|msg, ctx, next| {
//!     let _ = next.run(msg, ctx);
//!     next.run(msg, ctx)
//! });
//! ```
//!
//! Errors are never caught or translated here. Whatever a mod or the terminal
//! handler returns reaches the caller of the composed handler unchanged.

pub mod expiry;
pub mod size;
pub mod trace;

use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;
use crate::handler::{BoxedHandler, Handler};
use crate::message::Message;

// ── Mod trait ─────────────────────────────────────────────────────────────────

/// A unit of the chain: `(request, context, next) -> reply`.
pub trait Mod: Send + Sync + 'static {
    fn call(&self, message: &mut Message, context: &mut Context, next: Next<'_>) -> Result<Message>;

    /// Erases the concrete type.
    fn boxed(self) -> BoxedMod
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

/// A heap-allocated, type-erased mod.
pub type BoxedMod = Arc<dyn Mod>;

impl<M: Mod + ?Sized> Mod for Arc<M> {
    fn call(&self, message: &mut Message, context: &mut Context, next: Next<'_>) -> Result<Message> {
        (**self).call(message, context, next)
    }
}

/// Newtype wrapper that holds a closure and implements [`Mod`].
#[derive(Clone, Copy)]
pub struct FnMod<F>(F);

/// Turns a closure into a [`Mod`].
///
/// ```rust
/// use sepal::middleware::mod_fn;
/// use sepal::ConfigRecord;
///
/// let tag = mod_fn(|msg, ctx, next| {
///     msg.content.config_records.insert("tag", ConfigRecord::new());
///     let mut reply = next.run(msg, ctx)?;
///     reply.content.config_records.insert("tag", ConfigRecord::new());
///     Ok(reply)
/// });
/// ```
pub fn mod_fn<F>(f: F) -> FnMod<F>
where
    F: Fn(&mut Message, &mut Context, Next<'_>) -> Result<Message> + Send + Sync + 'static,
{
    FnMod(f)
}

impl<F> Mod for FnMod<F>
where
    F: Fn(&mut Message, &mut Context, Next<'_>) -> Result<Message> + Send + Sync + 'static,
{
    fn call(&self, message: &mut Message, context: &mut Context, next: Next<'_>) -> Result<Message> {
        (self.0)(message, context, next)
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// One-shot handle to the remainder of the chain.
pub struct Next<'a> {
    inner: &'a dyn Handler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(inner: &'a dyn Handler) -> Self {
        Self { inner }
    }

    /// Runs every layer inside the current one, then the terminal handler.
    pub fn run(self, message: &mut Message, context: &mut Context) -> Result<Message> {
        self.inner.call(message, context)
    }
}

// ── Composition ───────────────────────────────────────────────────────────────

/// One mod bound to everything inside it.
struct Layer {
    module: BoxedMod,
    next: BoxedHandler,
}

impl Handler for Layer {
    fn call(&self, message: &mut Message, context: &mut Context) -> Result<Message> {
        self.module.call(message, context, Next::new(&*self.next))
    }
}

/// Wraps `handler` in `mods`, first mod outermost.
///
/// With no mods the result is `handler` itself (the same `Arc`). Building
/// performs no I/O and cannot fail.
pub fn compose(handler: BoxedHandler, mods: &[BoxedMod]) -> BoxedHandler {
    mods.iter().rev().fold(handler, |next, module| {
        Arc::new(Layer { module: Arc::clone(module), next }) as BoxedHandler
    })
}

/// Builder form of [`compose`].
///
/// ```rust
/// use sepal::middleware::{Chain, mod_fn};
/// use sepal::{handler_fn, Context, Handler, Message, RecordDict};
///
/// let app = handler_fn(|msg: &mut Message, _: &mut Context| Ok(msg.reply(RecordDict::new())));
/// let chain = Chain::new(app.boxed())
///     .layer(mod_fn(|msg, ctx, next| next.run(msg, ctx)))
///     .build();
/// # let _ = chain;
/// ```
pub struct Chain {
    handler: BoxedHandler,
    mods: Vec<BoxedMod>,
}

impl Chain {
    pub fn new(handler: BoxedHandler) -> Self {
        Self { handler, mods: Vec::new() }
    }

    /// Appends `module` inside every layer added so far.
    pub fn layer(mut self, module: impl Mod) -> Self {
        self.mods.push(module.boxed());
        self
    }

    /// Appends already-erased mods, in order.
    pub fn layers(mut self, mods: impl IntoIterator<Item = BoxedMod>) -> Self {
        self.mods.extend(mods);
        self
    }

    pub fn build(self) -> BoxedHandler {
        compose(self.handler, &self.mods)
    }
}
