//! Built-in Kubernetes health-check responses.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the node take messages? Failure → pulled from load-balancer. |
//!
//! Both are served by [`Server`](crate::Server) without going through the app.

use http::StatusCode;

use crate::response::{self, HttpResponse};

/// Always `200 OK` with body `"ok"`. If the process can answer HTTP at all,
/// it is alive.
pub(crate) fn liveness() -> HttpResponse {
    response::text(StatusCode::OK, "ok")
}

/// `200 OK` with body `"ready"` once the app has at least one handler,
/// `503` otherwise.
pub(crate) fn readiness(handlers: usize) -> HttpResponse {
    if handlers > 0 {
        response::text(StatusCode::OK, "ready")
    } else {
        response::text(StatusCode::SERVICE_UNAVAILABLE, "no handlers registered")
    }
}
