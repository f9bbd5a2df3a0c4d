//! Middleware layer.
//!
//! Cross-cutting behaviour applied by the server around every routed request:
//!
//! - [`cors`]: permissive CORS headers and `OPTIONS` preflight answers.
//! - [`trace`]: one log event per request with method, path, status, latency.

pub mod cors;
pub mod trace;
