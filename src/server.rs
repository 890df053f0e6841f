//! HTTP node server and graceful shutdown.
//!
//! The server is the transport in front of a [`ClientApp`]:
//!
//! | Route | Behaviour |
//! |---|---|
//! | `POST /messages` | JSON [`Message`] in, JSON reply out |
//! | `GET /healthz` | liveness probe |
//! | `GET /readyz` | readiness probe |
//!
//! Each run gets its own [`Context`](crate::Context) from a [`ContextStore`].
//! The app is synchronous, so every message runs on tokio's blocking pool
//! while holding its run's context lock. Messages of one run are therefore
//! handled one at a time; different runs proceed in parallel.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **SIGINT** the server stops accepting connections, lets
//! every in-flight connection finish, then returns from [`Server::serve`].

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http::{Method, StatusCode};
use http_body_util::BodyExt;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::app::ClientApp;
use crate::config::UserConfig;
use crate::context::ContextStore;
use crate::error::Result;
use crate::handler::Handler;
use crate::health;
use crate::message::{ErrorCode, Message};
use crate::response::{self, HttpResponse};

/// The HTTP node server.
pub struct Server {
    addr: SocketAddr,
    node_id: u64,
    node_config: UserConfig,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use sepal::Server;
    /// let server = Server::bind("0.0.0.0:9094").node_id(3);
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr, node_id: 0, node_config: UserConfig::new() }
    }

    /// Node id copied into every run's context.
    pub fn node_id(mut self, node_id: u64) -> Self {
        self.node_id = node_id;
        self
    }

    /// Node configuration copied into every run's context.
    pub fn node_config(mut self, node_config: UserConfig) -> Self {
        self.node_config = node_config;
        self
    }

    /// Starts accepting connections and dispatching messages to `app`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, app: ClientApp) -> Result<()> {
        self.serve_with_shutdown(app, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops when `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        app: ClientApp,
        signal: impl Future<Output = ()>,
    ) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        let node = Arc::new(Node {
            app,
            contexts: ContextStore::new(self.node_id, self.node_config),
        });
        info!(addr = %self.addr, node_id = self.node_id, "sepal node listening");
        run(listener, node, signal).await;
        Ok(())
    }
}

/// Everything a connection task needs.
struct Node {
    app: ClientApp,
    contexts: ContextStore,
}

impl Node {
    /// Runs one message through the app under its run's context lock.
    ///
    /// App errors become an error reply; the sender always gets a message back.
    fn handle(&self, mut message: Message) -> Message {
        let cell = self.contexts.run(message.metadata.run_id);
        let mut context = ContextStore::lock(&cell);
        match self.app.call(&mut message, &mut context) {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    run_id = message.metadata.run_id,
                    message_type = %message.metadata.message_type,
                    "client app failed: {e}"
                );
                message.error_reply(ErrorCode::ClientAppRaisedException, e.to_string())
            }
        }
    }
}

async fn run(listener: TcpListener, node: Arc<Node>, signal: impl Future<Output = ()>) {
    // JoinSet tracks every spawned connection task so we can wait for them
    // all to finish during graceful shutdown.
    let mut tasks = tokio::task::JoinSet::new();

    tokio::pin!(signal);

    loop {
        tokio::select! {
            // Check shutdown first so a SIGTERM immediately stops accepting
            // new connections, even if more are queued.
            biased;

            () = &mut signal => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let node = Arc::clone(&node);
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // Called once per request on the connection.
                    let svc = service_fn(move |req| {
                        let node = Arc::clone(&node);
                        async move { dispatch(node, req).await }
                    });

                    // `auto::Builder` handles both HTTP/1.1 and HTTP/2.
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound on long-running servers.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}

    info!("sepal node stopped");
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one HTTP request. Failures are answered with a status code, so
/// hyper never sees an error.
async fn dispatch<B>(node: Arc<Node>, req: http::Request<B>) -> Result<HttpResponse, Infallible>
where
    B: hyper::body::Body,
    B::Error: Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/healthz") => health::liveness(),
        (&Method::GET, "/readyz") => health::readiness(node.app.message_types().count()),
        (&Method::POST, "/messages") => handle_message(node, req.into_body()).await,
        _ => response::text(StatusCode::NOT_FOUND, "not found"),
    };
    Ok(response)
}

async fn handle_message<B>(node: Arc<Node>, body: B) -> HttpResponse
where
    B: hyper::body::Body,
    B::Error: Display,
{
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {e}");
            return response::text(StatusCode::BAD_REQUEST, "unreadable body");
        }
    };

    let message: Message = match serde_json::from_slice(&bytes) {
        Ok(message) => message,
        Err(e) => {
            warn!("rejecting malformed message: {e}");
            return response::text(StatusCode::BAD_REQUEST, format!("invalid message: {e}"));
        }
    };

    let reply = match tokio::task::spawn_blocking(move || node.handle(message)).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("message task failed: {e}");
            return response::text(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };

    match serde_json::to_vec(&reply) {
        Ok(body) => response::json(StatusCode::OK, body),
        Err(e) => {
            error!("failed to encode reply: {e}");
            response::text(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C only on Windows).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // `pending()` never resolves, disabling the SIGTERM arm off Unix.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
