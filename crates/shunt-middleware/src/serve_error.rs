//! Terminal handlers writing fixed error responses

use bytes::Bytes;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderValue, Method, StatusCode};
use shunt_core::{Error, Handler, Request, ResponseWriter, Result};
use tracing::warn;

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Writes a fixed status and body.
///
/// `Content-Length` is set unless the response carries a
/// `Content-Encoding`; `Content-Type` only when none was set. `HEAD`
/// requests get the headers alone.
#[derive(Debug, Clone)]
pub struct ServeError {
    status: StatusCode,
    body: Bytes,
    length: HeaderValue,
    mime: HeaderValue,
}

impl ServeError {
    /// Serve `body` with `status`. A missing content type is guessed from
    /// the body.
    pub fn new(
        status: StatusCode,
        body: impl Into<Bytes>,
        content_type: Option<&str>,
    ) -> Result<Self> {
        let body = body.into();
        let sniffed;
        let content_type = match content_type {
            Some(ct) if !ct.is_empty() => ct,
            _ => {
                sniffed = sniff(&body);
                sniffed.as_ref()
            }
        };
        let mime = HeaderValue::from_str(content_type).map_err(|_| Error::InvalidHeaderValue {
            name: CONTENT_TYPE.to_string(),
        })?;

        Ok(Self {
            status,
            length: HeaderValue::from(body.len()),
            body,
            mime,
        })
    }

    /// Status written
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl Handler for ServeError {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        let h = w.headers_mut();
        if !h.contains_key(CONTENT_ENCODING) {
            h.insert(CONTENT_LENGTH, self.length.clone());
        }
        if !h.contains_key(CONTENT_TYPE) {
            h.insert(CONTENT_TYPE, self.mime.clone());
        }

        w.write_head(self.status);

        if req.method() != Method::HEAD {
            if let Err(e) = w.write_all(&self.body) {
                warn!(status = self.status.as_u16(), error = %e, "failed to write error body");
            }
        }
    }
}

/// Writes a plain-text error message with a status.
///
/// The message is followed by a newline. Any `Content-Length` set earlier is
/// dropped and the body is marked `nosniff`.
#[derive(Debug, Clone)]
pub struct ErrorMessage {
    status: StatusCode,
    body: Bytes,
}

impl ErrorMessage {
    /// Write `message` with `status`
    pub fn new(message: impl AsRef<str>, status: StatusCode) -> Self {
        let mut body = String::with_capacity(message.as_ref().len() + 1);
        body.push_str(message.as_ref());
        body.push('\n');
        Self {
            status,
            body: Bytes::from(body),
        }
    }
}

impl Handler for ErrorMessage {
    fn serve(&self, w: &mut dyn ResponseWriter, _req: &Request) {
        let h = w.headers_mut();
        h.remove(CONTENT_LENGTH);
        h.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8));
        h.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

        w.write_head(self.status);
        if let Err(e) = w.write_all(&self.body) {
            warn!(status = self.status.as_u16(), error = %e, "failed to write error message");
        }
    }
}

/// An [`ErrorMessage`] whose text is the canonical reason of `status`
pub fn error_code(status: StatusCode) -> ErrorMessage {
    ErrorMessage::new(status.canonical_reason().unwrap_or(""), status)
}

/// Rough content type of a body
fn sniff(body: &[u8]) -> mime::Mime {
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    let head = &body[start..];

    const HTML_TAGS: [&[u8]; 7] = [
        b"<!doctype html",
        b"<html",
        b"<head",
        b"<body",
        b"<h1",
        b"<p",
        b"<div",
    ];
    let is_html = HTML_TAGS.iter().any(|tag| {
        head.len() > tag.len()
            && head[..tag.len()].eq_ignore_ascii_case(tag)
            && matches!(head[tag.len()], b' ' | b'>')
    }) || head.starts_with(b"<!--");

    if is_html {
        mime::TEXT_HTML_UTF_8
    } else if head.starts_with(b"%PDF-") {
        mime::APPLICATION_PDF
    } else if std::str::from_utf8(body).is_ok() && !body.contains(&0) {
        mime::TEXT_PLAIN_UTF_8
    } else {
        mime::APPLICATION_OCTET_STREAM
    }
}
