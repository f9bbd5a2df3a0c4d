//! Per-request access log.

use std::time::Instant;

use tracing::{info, warn};

use crate::method::Method;
use crate::response::Response;

/// Captured at the start of a request; emits the log line when finished.
pub struct RequestLog {
    method: Method,
    path: String,
    started: Instant,
}

impl RequestLog {
    pub fn start(method: Method, path: &str) -> Self {
        Self { method, path: path.to_owned(), started: Instant::now() }
    }

    /// Logs the outcome. Server errors are logged at `warn`.
    pub fn finish(self, resp: &Response) {
        let status = resp.status_code().as_u16();
        let latency_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        if status >= 500 {
            warn!(method = %self.method, path = %self.path, status, latency_ms, bytes = resp.body().len(), "request failed");
        } else {
            info!(method = %self.method, path = %self.path, status, latency_ms, bytes = resp.body().len(), "request");
        }
    }
}
