//! Conditional short-circuit for cache revalidation

use crate::strip::strip_for_not_modified;
use http::header::IF_MODIFIED_SINCE;
use http::{Method, StatusCode};
use shunt_core::{Handler, Request, ResponseWriter};
use tracing::trace;

/// Answers every revalidating `GET` or `HEAD` with `304 Not Modified`.
///
/// A request qualifies when its first `If-Modified-Since` value is a valid
/// HTTP date. The wrapped handler is not run for such requests; for all
/// others it runs once, untouched.
#[derive(Debug, Clone)]
pub struct NeverModified<H> {
    handler: H,
}

impl<H: Handler> NeverModified<H> {
    /// Wrap `handler`
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<H: Handler> Handler for NeverModified<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        if is_revalidation(req) {
            trace!(uri = %req.uri(), "answering revalidation with 304");
            write_not_modified(w);
            return;
        }

        self.handler.serve(w, req);
    }
}

fn is_revalidation(req: &Request) -> bool {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return false;
    }

    match req.header_str(IF_MODIFIED_SINCE) {
        Some(since) if !since.is_empty() => httpdate::parse_http_date(since).is_ok(),
        _ => false,
    }
}

/// Commit a bare 304 on `w`
fn write_not_modified(w: &mut dyn ResponseWriter) {
    strip_for_not_modified(w.headers_mut());
    w.write_head(StatusCode::NOT_MODIFIED);
}
