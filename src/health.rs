//! Liveness and readiness checks.
//!
//! | Check | Path | Answers |
//! |---|---|---|
//! | **Liveness** | `/healthz` | the process is serving HTTP |
//! | **Readiness** | `/readyz` | the datastore was loaded and the API can take traffic |
//!
//! The datastore is loaded before the listener is bound, so once either
//! check is reachable both are true.

use crate::{Request, Response};

pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}
