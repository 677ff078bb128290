//! Request descriptor handed to handlers

use crate::Result;
use http::header::{HeaderName, HeaderValue, HOST};
use http::{HeaderMap, Method, Uri, Version};
use std::net::SocketAddr;

/// TLS session details of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsInfo {
    /// Negotiated protocol version, in wire encoding (0x0303 is TLS 1.2)
    pub version: u16,
    /// Whether the session was resumed
    pub did_resume: bool,
}

impl TlsInfo {
    /// SSL 3.0
    pub const SSL_3_0: u16 = 0x0300;
    /// TLS 1.0
    pub const TLS_1_0: u16 = 0x0301;
    /// TLS 1.1
    pub const TLS_1_1: u16 = 0x0302;
    /// TLS 1.2
    pub const TLS_1_2: u16 = 0x0303;
    /// TLS 1.3
    pub const TLS_1_3: u16 = 0x0304;

    /// Create a new TLS descriptor for a fresh session
    pub fn new(version: u16) -> Self {
        Self {
            version,
            did_resume: false,
        }
    }
}

/// An incoming request as seen by handlers.
///
/// Only the head is carried; reading the body is the transport's business.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    tls: Option<TlsInfo>,
}

impl Request {
    /// Create a request with the given method and target
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            remote_addr: None,
            tls: None,
        }
    }

    /// Start building a request
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Request method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request target
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Replace the request target
    pub fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }

    /// Protocol version
    pub fn version(&self) -> Version {
        self.version
    }

    /// Request headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable request headers
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Address of the peer, if the transport knows it
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// TLS session, if the request arrived over TLS
    pub fn tls(&self) -> Option<&TlsInfo> {
        self.tls.as_ref()
    }

    /// Host the request was addressed to: the `Host` header, falling
    /// back to the authority of an absolute-form target
    pub fn host(&self) -> Option<&str> {
        self.headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|h| !h.is_empty())
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
    }

    /// First value of a header as a string, if present and visible ASCII
    pub fn header_str(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl From<http::request::Parts> for Request {
    fn from(parts: http::request::Parts) -> Self {
        let remote_addr = parts.extensions.get::<SocketAddr>().copied();
        let tls = parts.extensions.get::<TlsInfo>().copied();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            remote_addr,
            tls,
        }
    }
}

/// Builder for [`Request`]
#[derive(Debug)]
pub struct RequestBuilder {
    inner: std::result::Result<Request, http::Error>,
}

impl RequestBuilder {
    /// Create a builder for `GET /`
    pub fn new() -> Self {
        Self {
            inner: Ok(Request::new(Method::GET, Uri::from_static("/"))),
        }
    }

    /// Set the method
    pub fn method<T>(self, method: T) -> Self
    where
        Method: TryFrom<T>,
        <Method as TryFrom<T>>::Error: Into<http::Error>,
    {
        self.and_then(move |mut req| {
            req.method = Method::try_from(method).map_err(Into::into)?;
            Ok(req)
        })
    }

    /// Set the request target
    pub fn uri<T>(self, uri: T) -> Self
    where
        Uri: TryFrom<T>,
        <Uri as TryFrom<T>>::Error: Into<http::Error>,
    {
        self.and_then(move |mut req| {
            req.uri = Uri::try_from(uri).map_err(Into::into)?;
            Ok(req)
        })
    }

    /// Set the protocol version
    pub fn version(self, version: Version) -> Self {
        self.and_then(move |mut req| {
            req.version = version;
            Ok(req)
        })
    }

    /// Append a header
    pub fn header<K, V>(self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.and_then(move |mut req| {
            let name = HeaderName::try_from(name).map_err(Into::into)?;
            let value = HeaderValue::try_from(value).map_err(Into::into)?;
            req.headers.append(name, value);
            Ok(req)
        })
    }

    /// Set the peer address
    pub fn remote_addr(self, addr: SocketAddr) -> Self {
        self.and_then(move |mut req| {
            req.remote_addr = Some(addr);
            Ok(req)
        })
    }

    /// Mark the request as received over TLS
    pub fn tls(self, tls: TlsInfo) -> Self {
        self.and_then(move |mut req| {
            req.tls = Some(tls);
            Ok(req)
        })
    }

    /// Finish building
    pub fn build(self) -> Result<Request> {
        Ok(self.inner?)
    }

    fn and_then<F>(self, f: F) -> Self
    where
        F: FnOnce(Request) -> std::result::Result<Request, http::Error>,
    {
        Self {
            inner: self.inner.and_then(f),
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = Request::builder()
            .method("HEAD")
            .uri("/path?q=1")
            .version(Version::HTTP_2)
            .header("host", "example.com")
            .remote_addr("192.0.2.1:4711".parse().unwrap())
            .tls(TlsInfo::new(TlsInfo::TLS_1_3))
            .build()
            .unwrap();

        assert_eq!(req.method(), Method::HEAD);
        assert_eq!(req.uri().path(), "/path");
        assert_eq!(req.version(), Version::HTTP_2);
        assert_eq!(req.host(), Some("example.com"));
        assert_eq!(req.tls().map(|t| t.version), Some(0x0304));
        assert_eq!(req.remote_addr().unwrap().port(), 4711);
    }

    #[test]
    fn test_request_builder_error() {
        let result = Request::builder().header("bad header", "x").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_host_fallback() {
        let req = Request::builder()
            .uri("http://origin.example:8080/x")
            .build()
            .unwrap();
        assert_eq!(req.host(), Some("origin.example:8080"));

        let req = Request::builder().uri("/x").build().unwrap();
        assert_eq!(req.host(), None);
    }

    #[test]
    fn test_from_parts() {
        let mut parts = http::Request::builder()
            .method(Method::POST)
            .uri("/submit")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        parts
            .extensions
            .insert::<SocketAddr>("[::1]:80".parse().unwrap());

        let req = Request::from(parts);
        assert_eq!(req.method(), Method::POST);
        assert!(req.remote_addr().is_some());
        assert!(req.tls().is_none());
    }
}
