//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A [`ClientApp`](crate::ClientApp) holds handlers of *different* concrete
//! types in one map, and a mod chain nests handlers inside each other. Both
//! need a uniform type, so handlers are erased to `Arc<dyn Handler>`:
//!
//! ```text
//! fn train(msg: &mut Message, ctx: &mut Context) -> Result<Message>   ← user writes this
//!        ↓ handler_fn(train)
//! FnHandler(train)                                   ← typed wrapper, implements Handler
//!        ↓ .boxed()
//! Arc<dyn Handler>  (BoxedHandler)                   ← shared, type-erased
//!        ↓ handler.call(&mut msg, &mut ctx)
//! one virtual call per chain layer
//! ```
//!
//! `Arc` lets the same composed handler be shared by the app registry and any
//! number of concurrent runs without copying it.

use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;
use crate::message::Message;

/// The `(request, context) -> reply` shape shared by terminal handlers and
/// composed chains.
///
/// Implement it on your own types, or wrap a closure with [`handler_fn`].
/// The request is borrowed mutably: payload entries appended by any
/// participant remain visible to the caller after the call returns.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, message: &mut Message, context: &mut Context) -> Result<Message>;

    /// Erases the concrete type.
    fn boxed(self) -> BoxedHandler
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

/// A heap-allocated, type-erased handler shared across runs.
pub type BoxedHandler = Arc<dyn Handler>;

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call(&self, message: &mut Message, context: &mut Context) -> Result<Message> {
        (**self).call(message, context)
    }
}

/// Newtype wrapper that holds a closure and implements [`Handler`].
#[derive(Clone, Copy)]
pub struct FnHandler<F>(F);

/// Turns a closure into a [`Handler`].
///
/// ```rust
/// use sepal::{handler_fn, Context, Handler, Message};
///
/// let echo = handler_fn(|msg: &mut Message, _ctx: &mut Context| Ok(msg.reply(msg.content.clone())));
/// # let _ = echo.boxed();
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut Message, &mut Context) -> Result<Message> + Send + Sync + 'static,
{
    FnHandler(f)
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut Message, &mut Context) -> Result<Message> + Send + Sync + 'static,
{
    fn call(&self, message: &mut Message, context: &mut Context) -> Result<Message> {
        (self.0)(message, context)
    }
}
