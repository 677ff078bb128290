//! Access logging interceptor
//!
//! Writes one human-readable line per request:
//!
//! ```text
//! 2017/06/12 14:02:31 192.0.2.7 TLS1.3 HTTP/2.0 GET https://example.com/a?b 200 5120 734 resumed
//! ```
//!
//! Fields are timestamp, client host, TLS version (absent for plain
//! HTTP), protocol, method, URL, status, body bytes and elapsed
//! microseconds, optionally followed by `resumed` and `h2-pushed`. The
//! format is meant for people and may change.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use shunt_core::{Handler, Intercepted, Outcome, Policy, Request, ResponseWriter, TlsInfo};
use std::cell::RefCell;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Request header marking a request synthesised by a server push
pub const PUSH_MARKER_HEADER: &str = "x-h2-push";

thread_local! {
    static SCRATCH: RefCell<Vec<u8>> = RefCell::new(Vec::with_capacity(256));
}

/// Access log destination
#[derive(Clone)]
pub enum AccessLogOutput {
    /// Standard error
    Stderr,
    /// Standard output
    Stdout,
    /// Append to a file
    File(PathBuf),
    /// Any writer
    Custom(Arc<Mutex<dyn Write + Send>>),
}

impl AccessLogOutput {
    /// Log into an arbitrary writer
    pub fn writer(w: impl Write + Send + 'static) -> Self {
        AccessLogOutput::Custom(Arc::new(Mutex::new(w)))
    }
}

impl Default for AccessLogOutput {
    fn default() -> Self {
        AccessLogOutput::Stderr
    }
}

impl fmt::Debug for AccessLogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stderr => write!(f, "Stderr"),
            Self::Stdout => write!(f, "Stdout"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Opened log sink, shared by all requests
enum Sink {
    Stderr,
    Stdout,
    Writer(Arc<Mutex<dyn Write + Send>>),
}

impl Sink {
    fn open(output: AccessLogOutput) -> io::Result<Self> {
        Ok(match output {
            AccessLogOutput::Stderr => Sink::Stderr,
            AccessLogOutput::Stdout => Sink::Stdout,
            AccessLogOutput::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Sink::Writer(Arc::new(Mutex::new(file)))
            }
            AccessLogOutput::Custom(w) => Sink::Writer(w),
        })
    }

    fn write_line(&self, line: &[u8]) -> io::Result<()> {
        match self {
            Sink::Stderr => io::stderr().lock().write_all(line),
            Sink::Stdout => io::stdout().lock().write_all(line),
            Sink::Writer(w) => w.lock().write_all(line),
        }
    }
}

/// Access log middleware
///
/// Wraps a handler and logs every request it serves, including requests
/// whose handler panics. Status, headers and body pass through untouched.
///
/// # Example
///
/// ```
/// use shunt_core::testing::MockHandler;
/// use shunt_core::StatusCode;
/// use shunt_middleware::{AccessLog, AccessLogOutput};
///
/// let logged = AccessLog::new(MockHandler::new(StatusCode::OK), AccessLogOutput::Stderr)?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct AccessLog<H> {
    handler: H,
    sink: Sink,
}

impl<H: Handler> AccessLog<H> {
    /// Wrap `handler`, logging to `output`. Opening a file output may fail.
    pub fn new(handler: H, output: AccessLogOutput) -> io::Result<Self> {
        Ok(Self {
            handler,
            sink: Sink::open(output)?,
        })
    }

    /// Wrap `handler`, logging to standard error
    pub fn stderr(handler: H) -> Self {
        Self {
            handler,
            sink: Sink::Stderr,
        }
    }
}

impl<H: fmt::Debug> fmt::Debug for AccessLog<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sink = match self.sink {
            Sink::Stderr => "stderr",
            Sink::Stdout => "stdout",
            Sink::Writer(_) => "writer",
        };
        f.debug_struct("AccessLog")
            .field("handler", &self.handler)
            .field("sink", &sink)
            .finish()
    }
}

impl<H: Handler> Handler for AccessLog<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        let record = Record {
            sink: &self.sink,
            started_at: Local::now(),
        };
        Intercepted::serve(w, req, record, &self.handler);
    }
}

struct Record<'s> {
    sink: &'s Sink,
    started_at: DateTime<Local>,
}

impl Policy for Record<'_> {
    fn finish(&mut self, req: &Request, outcome: &Outcome) {
        debug!(
            method = %req.method(),
            uri = %req.uri(),
            status = outcome.status.as_u16(),
            bytes = outcome.bytes,
            elapsed_us = outcome.elapsed.as_micros() as u64,
            completed = outcome.completed,
            "request served"
        );

        let result = SCRATCH.with(|scratch| {
            // re-entrant use gets a fresh buffer
            let mut fallback = Vec::new();
            let mut guard = scratch.try_borrow_mut();
            let buf = match guard {
                Ok(ref mut buf) => &mut **buf,
                Err(_) => &mut fallback,
            };
            buf.clear();
            format_line(buf, &self.started_at, req, outcome)?;
            self.sink.write_line(buf)
        });

        if let Err(e) = result {
            warn!(error = %e, "failed to write access log line");
        }
    }
}

/// Log label of a TLS protocol version, padded with spaces
pub fn tls_version_label(version: u16) -> &'static str {
    match version {
        TlsInfo::SSL_3_0 => " SSL3.0 ",
        TlsInfo::TLS_1_0 => " TLS1.0 ",
        TlsInfo::TLS_1_1 => " TLS1.1 ",
        TlsInfo::TLS_1_2 => " TLS1.2 ",
        TlsInfo::TLS_1_3 => " TLS1.3 ",
        0x7f12 => " TLS1.3-d18 ",
        0x7f16 => " TLS1.3-d22 ",
        _ => " TLS:? ",
    }
}

fn format_line(
    buf: &mut Vec<u8>,
    started_at: &DateTime<Local>,
    req: &Request,
    outcome: &Outcome,
) -> io::Result<()> {
    let mut num = itoa::Buffer::new();

    write!(buf, "{}", started_at.format("%Y/%m/%d %H:%M:%S"))?;
    buf.push(b' ');
    if let Some(addr) = req.remote_addr() {
        write!(buf, "{}", addr.ip())?;
    }

    match req.tls() {
        None => buf.push(b' '),
        Some(tls) => buf.extend_from_slice(tls_version_label(tls.version).as_bytes()),
    }

    write!(buf, "{:?} {} ", req.version(), req.method())?;

    let scheme = if req.tls().is_some() { "https" } else { "http" };
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    write!(buf, "{scheme}://{}{target}", req.host().unwrap_or(""))?;

    buf.push(b' ');
    buf.extend_from_slice(num.format(outcome.status.as_u16()).as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(num.format(outcome.bytes).as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(num.format(outcome.elapsed.as_micros()).as_bytes());

    if req.tls().map_or(false, |tls| tls.did_resume) {
        buf.extend_from_slice(b" resumed");
    }
    if req.headers().contains_key(PUSH_MARKER_HEADER) {
        buf.extend_from_slice(b" h2-pushed");
    }

    buf.push(b'\n');
    Ok(())
}
