//! Precomputed error pages
//!
//! [`StaticErrors`] replaces responses whose first committed status has a
//! page in its table. Pages are rendered once at setup; serving one costs a
//! header rewrite and a single body write.

use crate::strip::strip_cache_headers;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use shunt_core::{Handler, Intercepted, Policy, Request, ResponseWriter};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

const HTML_UTF8: &str = "text/html; charset=utf-8";

const MSIE_PADDING: &str = "
<!-- a padding to disable MSIE and Chrome friendly error page -->
<!-- a padding to disable MSIE and Chrome friendly error page -->
<!-- a padding to disable MSIE and Chrome friendly error page -->
<!-- a padding to disable MSIE and Chrome friendly error page -->
<!-- a padding to disable MSIE and Chrome friendly error page -->
<!-- a padding to disable MSIE and Chrome friendly error page -->";

/// A rendered error page
#[derive(Debug, Clone, Default)]
pub struct StaticError {
    /// Page body
    pub body: Bytes,
    /// Headers set on the response, overriding the defaults
    pub headers: HeaderMap,
}

impl StaticError {
    /// Page with `body` and no extra headers
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Minimal HTML page for `status` with a title and a message
    pub fn from_message(status: StatusCode, name: &str, message: &str) -> Self {
        let body = format!(
            "<!doctype html>\n<html>\n<head><title>{code} {name}</title></head>\n\
             <body>\n<h1>{code} {name}</h1>\n<p>{message}</p>\n</body>\n</html>\n",
            code = status.as_u16(),
            name = escape_html(name),
            message = escape_html(message),
        );
        Self::new(body)
    }

    /// Add a header sent with this page
    pub fn with_header(mut self, name: http::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Stock messages as `(status, name, message)`
pub fn default_error_messages() -> &'static [(StatusCode, &'static str, &'static str)] {
    &[
        (
            StatusCode::BAD_REQUEST,
            "Bad Request",
            "Your user agent sent a request that this server could not understand.",
        ),
        (
            StatusCode::FORBIDDEN,
            "Forbidden",
            "You do not have permission to access this resource.",
        ),
        (
            StatusCode::NOT_FOUND,
            "File Not Found",
            "The link you followed may be broken, or the page may have been removed.",
        ),
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed",
            "The specified HTTP method is not allowed for the requested resource.",
        ),
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "An internal server error has occurred.",
        ),
    ]
}

/// Error page table
pub type ErrorPages = HashMap<StatusCode, StaticError>;

/// Pages rendered from [`default_error_messages`]
pub fn default_error_pages() -> ErrorPages {
    default_error_messages()
        .iter()
        .map(|&(status, name, message)| (status, StaticError::from_message(status, name, message)))
        .collect()
}

/// Serves precomputed pages in place of error responses.
///
/// # Example
///
/// ```
/// use shunt_core::testing::{MockHandler, Recorder};
/// use shunt_core::{Handler, Request, StatusCode};
/// use shunt_middleware::StaticErrors;
///
/// let pages = StaticErrors::with_default_pages(MockHandler::new(StatusCode::NOT_FOUND));
/// let mut rec = Recorder::new();
/// pages.serve(&mut rec, &Request::builder().build()?);
/// assert!(rec.body_str().contains("File Not Found"));
/// # Ok::<(), shunt_core::Error>(())
/// ```
pub struct StaticErrors<H> {
    handler: H,
    pages: Arc<ErrorPages>,
    disable_padding: bool,
}

impl<H: Handler> StaticErrors<H> {
    /// Wrap `handler` with the given page table
    pub fn new(handler: H, pages: impl Into<Arc<ErrorPages>>) -> Self {
        Self {
            handler,
            pages: pages.into(),
            disable_padding: false,
        }
    }

    /// Wrap `handler` with [`default_error_pages`]
    pub fn with_default_pages(handler: H) -> Self {
        Self::new(handler, default_error_pages())
    }

    /// Never append the friendly-error padding
    pub fn disable_padding(mut self) -> Self {
        self.disable_padding = true;
        self
    }
}

impl<H: fmt::Debug> fmt::Debug for StaticErrors<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statuses: Vec<_> = self.pages.keys().map(|s| s.as_u16()).collect();
        statuses.sort_unstable();
        f.debug_struct("StaticErrors")
            .field("handler", &self.handler)
            .field("statuses", &statuses)
            .field("disable_padding", &self.disable_padding)
            .finish()
    }
}

impl<H: Handler> Handler for StaticErrors<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        let policy = Pages {
            pages: &self.pages,
            disable_padding: self.disable_padding,
        };
        Intercepted::serve(w, req, policy, &self.handler);
    }
}

struct Pages<'m> {
    pages: &'m ErrorPages,
    disable_padding: bool,
}

impl Policy for Pages<'_> {
    fn should_divert(&self, status: StatusCode) -> bool {
        self.pages.contains_key(&status)
    }

    fn divert(&mut self, status: StatusCode, w: &mut dyn ResponseWriter, req: &Request) {
        let Some(page) = self.pages.get(&status) else {
            return;
        };

        let padding = if status.as_u16() >= 400 && !self.disable_padding && wants_padding(req) {
            MSIE_PADDING
        } else {
            ""
        };

        let h = w.headers_mut();
        strip_cache_headers(h);
        h.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_UTF8));
        for name in page.headers.keys() {
            h.remove(name);
        }
        for (name, value) in &page.headers {
            h.append(name.clone(), value.clone());
        }
        let length = itoa::Buffer::new()
            .format(page.body.len() + padding.len())
            .parse::<HeaderValue>();
        if let Ok(length) = length {
            h.insert(CONTENT_LENGTH, length);
        }

        w.write_head(status);

        if req.method() == Method::HEAD {
            return;
        }

        let mut result = w.write_all(&page.body);
        if result.is_ok() && !padding.is_empty() {
            result = w.write_all(padding.as_bytes());
        }
        if let Err(e) = result {
            warn!(status = status.as_u16(), error = %e, "failed to write error page");
        }
    }
}

/// Old MSIE replaces short error bodies with its own page
fn wants_padding(req: &Request) -> bool {
    let Some(ua) = req.header_str(USER_AGENT) else {
        return false;
    };
    match ua.find("MSIE ") {
        Some(at) => at + 7 < ua.len() && !ua.contains("Opera"),
        None => false,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
