//! Response header decorators
//!
//! These run before the wrapped handler, so the handler can still override
//! what they set. Names and values are validated once at construction.

use http::{HeaderName, HeaderValue};
use shunt_core::header::{parse_header_name, parse_header_value, resolve_headers};
use shunt_core::{Handler, Request, ResponseWriter, Result};
use tracing::debug;

/// Replaces a response header
#[derive(Debug, Clone)]
pub struct SetHeader<H> {
    handler: H,
    name: HeaderName,
    value: HeaderValue,
}

impl<H: Handler> SetHeader<H> {
    /// Set `name: value` on every response of `handler`
    pub fn new(handler: H, name: &str, value: &str) -> Result<Self> {
        Ok(Self {
            handler,
            name: parse_header_name(name)?,
            value: parse_header_value(name, value)?,
        })
    }
}

impl<H: Handler> Handler for SetHeader<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        if let Err(e) = w.set_header(self.name.clone(), self.value.clone()) {
            debug!(header = %self.name, error = %e, "header not set");
        }
        self.handler.serve(w, req);
    }
}

/// Appends a response header value
#[derive(Debug, Clone)]
pub struct AddHeader<H> {
    handler: H,
    name: HeaderName,
    value: HeaderValue,
}

impl<H: Handler> AddHeader<H> {
    /// Append `name: value` to every response of `handler`
    pub fn new(handler: H, name: &str, value: &str) -> Result<Self> {
        Ok(Self {
            handler,
            name: parse_header_name(name)?,
            value: parse_header_value(name, value)?,
        })
    }
}

impl<H: Handler> Handler for AddHeader<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        if let Err(e) = w.append_header(self.name.clone(), self.value.clone()) {
            debug!(header = %self.name, error = %e, "header not added");
        }
        self.handler.serve(w, req);
    }
}

/// Removes a response header
#[derive(Debug, Clone)]
pub struct DeleteHeader<H> {
    handler: H,
    name: HeaderName,
}

impl<H: Handler> DeleteHeader<H> {
    /// Remove `name` before `handler` runs
    pub fn new(handler: H, name: &str) -> Result<Self> {
        Ok(Self {
            handler,
            name: parse_header_name(name)?,
        })
    }
}

impl<H: Handler> Handler for DeleteHeader<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        if let Err(e) = w.remove_header(&self.name) {
            debug!(header = %self.name, error = %e, "header not removed");
        }
        self.handler.serve(w, req);
    }
}

/// Replaces a set of response headers.
///
/// Keys differing only in case name the same header; the value given under
/// the canonical spelling wins.
#[derive(Debug, Clone)]
pub struct SetHeaders<H> {
    handler: H,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl<H: Handler> SetHeaders<H> {
    /// Set every `(name, value)` pair on each response of `handler`
    pub fn new<'a, I>(handler: H, headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Ok(Self {
            handler,
            headers: resolve_headers(headers)?,
        })
    }

    /// Resolved headers, sorted by name
    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }
}

impl<H: Handler> Handler for SetHeaders<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        for (name, value) in &self.headers {
            if let Err(e) = w.set_header(name.clone(), value.clone()) {
                debug!(header = %name, error = %e, "header not set");
                break;
            }
        }
        self.handler.serve(w, req);
    }
}
