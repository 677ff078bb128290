//! Testing utilities
//!
//! [`Recorder`] is an in-memory response writer that can be configured to
//! expose any subset of the optional capabilities. [`MockHandler`] is a
//! handler that counts its calls and writes a canned response.

use crate::capability::{
    Capability, CapabilityMask, CloseNotifier, CloseSignal, Flusher, Hijacked, Hijacker,
    PushOptions, Pusher,
};
use crate::handler::Handler;
use crate::request::Request;
use crate::writer::{Commit, ResponseWriter};
use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// In-memory response writer
#[derive(Debug)]
pub struct Recorder {
    headers: HeaderMap,
    sent_headers: Option<HeaderMap>,
    status: Option<StatusCode>,
    head_calls: usize,
    body: BytesMut,
    mask: CapabilityMask,
    flushes: usize,
    pushes: Vec<String>,
    hijacked: bool,
    fail_writes: bool,
    closed: Arc<watch::Sender<bool>>,
}

impl Recorder {
    /// Recorder without optional capabilities
    pub fn new() -> Self {
        Self::with_capabilities(CapabilityMask::NONE)
    }

    /// Recorder exposing exactly `mask`
    pub fn with_capabilities(mask: CapabilityMask) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            headers: HeaderMap::new(),
            sent_headers: None,
            status: None,
            head_calls: 0,
            body: BytesMut::new(),
            mask,
            flushes: 0,
            pushes: Vec::new(),
            hijacked: false,
            fail_writes: false,
            closed: Arc::new(closed),
        }
    }

    /// Make every body write fail as if the client had disconnected
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Pre-populate a response header
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.append(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
        self
    }

    /// Committed status, if any
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Committed status, `200 OK` when nothing was committed
    pub fn code(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Number of commits that reached the writer
    pub fn head_calls(&self) -> usize {
        self.head_calls
    }

    /// Headers as the client saw them, or the current headers when nothing
    /// was committed
    pub fn sent_headers(&self) -> &HeaderMap {
        self.sent_headers.as_ref().unwrap_or(&self.headers)
    }

    /// Body bytes received
    pub fn body(&self) -> Bytes {
        self.body.clone().freeze()
    }

    /// Body as text
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Number of flushes
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Pushed targets, in order
    pub fn pushes(&self) -> &[String] {
        &self.pushes
    }

    /// Whether the connection was hijacked
    pub fn is_hijacked(&self) -> bool {
        self.hijacked
    }

    /// Sender side of the close signal; send `true` to simulate the client
    /// going away
    pub fn disconnect_handle(&self) -> Arc<watch::Sender<bool>> {
        Arc::clone(&self.closed)
    }

    fn commit(&mut self, status: StatusCode) -> Commit {
        if self.status.is_some() || self.hijacked {
            return Commit::Ignored;
        }
        self.status = Some(status);
        self.head_calls += 1;
        self.sent_headers = Some(self.headers.clone());
        Commit::Sent
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter for Recorder {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) -> Commit {
        self.commit(status)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.hijacked {
            return Err(Error::Hijacked);
        }
        self.commit(StatusCode::OK);
        if self.fail_writes {
            return Err(Error::Io(io::ErrorKind::BrokenPipe.into()));
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn is_committed(&self) -> bool {
        self.status.is_some() || self.hijacked
    }

    fn flusher(&mut self) -> Option<&mut dyn Flusher> {
        if self.mask.contains(Capability::Flush) {
            Some(self)
        } else {
            None
        }
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        if self.mask.contains(Capability::Hijack) {
            Some(self)
        } else {
            None
        }
    }

    fn pusher(&mut self) -> Option<&mut dyn Pusher> {
        if self.mask.contains(Capability::Push) {
            Some(self)
        } else {
            None
        }
    }

    fn close_notifier(&mut self) -> Option<&mut dyn CloseNotifier> {
        if self.mask.contains(Capability::CloseNotify) {
            Some(self)
        } else {
            None
        }
    }
}

impl Flusher for Recorder {
    fn flush(&mut self) -> Result<()> {
        if self.hijacked {
            return Err(Error::Hijacked);
        }
        self.commit(StatusCode::OK);
        self.flushes += 1;
        Ok(())
    }
}

impl Hijacker for Recorder {
    fn hijack(&mut self) -> Result<Hijacked> {
        if self.hijacked {
            return Err(Error::Hijacked);
        }
        self.hijacked = true;
        Ok(Hijacked {
            conn: Box::new(io::Cursor::new(Vec::new())),
            buffered: Bytes::new(),
        })
    }
}

impl Pusher for Recorder {
    fn push(&mut self, target: &str, _opts: &PushOptions) -> Result<()> {
        self.pushes.push(target.to_string());
        Ok(())
    }
}

impl CloseNotifier for Recorder {
    fn close_notify(&mut self) -> Result<CloseSignal> {
        Ok(self.closed.subscribe())
    }
}

/// Handler writing a fixed response and counting its calls
#[derive(Debug, Clone)]
pub struct MockHandler {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
    calls: Arc<AtomicUsize>,
}

impl MockHandler {
    /// Handler that commits `status` and writes nothing
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set a header before committing
    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
        self
    }

    /// Write `body` after committing
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Number of times the handler ran
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Handler for MockHandler {
    fn serve(&self, w: &mut dyn ResponseWriter, _req: &Request) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for (name, value) in &self.headers {
            let _ = w.set_header(name.clone(), value.clone());
        }
        w.write_head(self.status);
        if !self.body.is_empty() {
            let _ = w.write_all(&self.body);
        }
    }
}
