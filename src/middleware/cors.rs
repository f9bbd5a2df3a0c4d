//! Permissive CORS.
//!
//! Every response is readable from any origin, and an `OPTIONS` preflight on
//! any path is answered directly without reaching the router.

use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, HEAD, PUT, PATCH, POST, DELETE";

/// Answers a preflight request, or returns `None` for anything else.
pub fn preflight(req: &Request) -> Option<Response> {
    if req.method() != Method::Options {
        return None;
    }
    let allow_headers = req
        .header("access-control-request-headers")
        .unwrap_or("content-type")
        .to_owned();
    let resp = Response::builder()
        .status(Status::NoContent)
        .header("access-control-allow-methods", ALLOW_METHODS)
        .header("access-control-allow-headers", &allow_headers)
        .no_body();
    Some(resp)
}

/// Adds the origin header to an outgoing response.
pub fn decorate(mut resp: Response) -> Response {
    resp.set_header("access-control-allow-origin", ALLOW_ORIGIN);
    resp
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn preflight_echoes_requested_headers() {
        let req = Request::new(
            Method::Options,
            "/books",
            vec![("Access-Control-Request-Headers".into(), "content-type, x-trace".into())],
            Bytes::new(),
        );
        let resp = preflight(&req).unwrap();
        assert_eq!(resp.status_code(), Status::NoContent);
        assert_eq!(resp.header("access-control-allow-headers"), Some("content-type, x-trace"));
    }

    #[test]
    fn non_options_requests_pass_through() {
        let req = Request::new(Method::Get, "/books", Vec::new(), Bytes::new());
        assert!(preflight(&req).is_none());
    }

    #[test]
    fn decorate_sets_origin_once() {
        let resp = decorate(decorate(Response::text("x")));
        let origins = resp.headers.iter()
            .filter(|(k, _)| k == "access-control-allow-origin")
            .count();
        assert_eq!(origins, 1);
    }
}
