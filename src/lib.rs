//! # sepal
//!
//! Mod chains for federated client apps.
//!
//! A client app answers messages (`train`, `evaluate`, `query`) with replies.
//! Around each handler sits an ordered list of **mods**: interceptors that see
//! the message on its way in, decide whether to pass it on, and see the reply
//! on its way out. sepal composes them into one handler with onion ordering
//! and nothing else: no retries, no error translation, no hidden state.
//!
//! ## The contract
//!
//! - Mods run in list order on the way in and in reverse on the way out.
//! - The terminal handler runs exactly once, unless a mod filters the message
//!   by replying without running [`Next`](middleware::Next).
//! - One [`Context`] is shared by exclusive reference through the whole chain.
//! - Errors reach the caller exactly as the failing participant returned them.
//!
//! ## Quick start
//!
//! ```rust
//! use sepal::middleware::{mod_fn, Mod};
//! use sepal::{handler_fn, ClientApp, ConfigRecord, Context, Handler, Message, Metadata, RecordDict};
//!
//! let app = ClientApp::with_mods([
//!     mod_fn(|msg, ctx, next| {
//!         msg.content.config_records.insert("audit", ConfigRecord::new());
//!         next.run(msg, ctx)
//!     })
//!     .boxed(),
//! ])
//! .train(handler_fn(|msg: &mut Message, _ctx: &mut Context| {
//!     Ok(msg.reply(RecordDict::new()))
//! }));
//!
//! let mut msg = Message::with_metadata(Metadata::new(1, 0, 7, "train"), RecordDict::new());
//! let reply = app.call(&mut msg, &mut Context::new(1, 7)).unwrap();
//!
//! assert!(msg.content.config_records.contains("audit"));
//! assert_eq!(reply.metadata.reply_to_message_id, msg.metadata.message_id);
//! ```
//!
//! To put an app on the network, hand it to [`Server`]:
//!
//! ```rust,no_run
//! # use sepal::{ClientApp, Server};
//! # async fn run(app: ClientApp) -> sepal::Result<()> {
//! Server::bind("0.0.0.0:9094").node_id(7).serve(app).await
//! # }
//! ```

mod app;
mod context;
mod error;
mod handler;
mod health;
mod message;
mod record;
mod response;
mod server;

pub mod config;
pub mod middleware;

pub use app::{validate_message_type, ClientApp};
pub use context::{Context, ContextStore};
pub use error::{Error, Result, Violation};
pub use handler::{handler_fn, BoxedHandler, FnHandler, Handler};
pub use message::{message_type, now, ErrorCode, Message, MessageError, Metadata, DEFAULT_TTL};
pub use record::{ConfigRecord, Metric, MetricRecord, Record, RecordDict, Scalar, TypedRecords};
pub use server::Server;
