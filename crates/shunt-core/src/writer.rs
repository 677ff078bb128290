//! Response writer contract

use crate::capability::{CloseNotifier, Flusher, Hijacker, Pusher};
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::io;

/// What a call to [`ResponseWriter::write_head`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// The status line and headers were sent
    Sent,
    /// A status was already committed; this call changed nothing
    Ignored,
    /// A substitute handler took over the response
    Diverted,
}

impl Commit {
    /// Whether this call committed the status it was given
    pub fn is_sent(self) -> bool {
        self == Commit::Sent
    }
}

/// The sink a handler writes its response into.
///
/// Headers may be changed until the first [`write_head`] or [`write`];
/// after that the status line and headers have left and changes through
/// [`headers_mut`] are invisible to the client. The provided
/// `set_header`/`append_header`/`remove_header` methods report that case
/// as [`Error::HeadersCommitted`] instead of silently doing nothing.
///
/// Optional capabilities are exposed through the `flusher`, `hijacker`,
/// `pusher` and `close_notifier` accessors. `None` means the writer does
/// not have the capability at all; implementations must return the same
/// answer for the whole lifetime of the writer.
///
/// [`write_head`]: ResponseWriter::write_head
/// [`write`]: ResponseWriter::write
/// [`headers_mut`]: ResponseWriter::headers_mut
pub trait ResponseWriter {
    /// Response headers
    fn headers(&self) -> &HeaderMap;

    /// Mutable response headers
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commit the status line and headers. The first call wins.
    fn write_head(&mut self, status: StatusCode) -> Commit;

    /// Write body bytes, committing `200 OK` first if nothing was committed
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Whether a status has been committed
    fn is_committed(&self) -> bool;

    /// Write the whole buffer
    fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(Error::Io(io::ErrorKind::WriteZero.into())),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }

    /// Replace all values of a header
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()> {
        if self.is_committed() {
            return Err(Error::HeadersCommitted);
        }
        self.headers_mut().insert(name, value);
        Ok(())
    }

    /// Add a value to a header
    fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()> {
        if self.is_committed() {
            return Err(Error::HeadersCommitted);
        }
        self.headers_mut().append(name, value);
        Ok(())
    }

    /// Remove every value of a header
    fn remove_header(&mut self, name: &HeaderName) -> Result<()> {
        if self.is_committed() {
            return Err(Error::HeadersCommitted);
        }
        self.headers_mut().remove(name);
        Ok(())
    }

    /// Flush capability, if supported
    fn flusher(&mut self) -> Option<&mut dyn Flusher> {
        None
    }

    /// Hijack capability, if supported
    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        None
    }

    /// Push capability, if supported
    fn pusher(&mut self) -> Option<&mut dyn Pusher> {
        None
    }

    /// Close notification capability, if supported
    fn close_notifier(&mut self) -> Option<&mut dyn CloseNotifier> {
        None
    }
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn headers(&self) -> &HeaderMap {
        (**self).headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_head(&mut self, status: StatusCode) -> Commit {
        (**self).write_head(status)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn is_committed(&self) -> bool {
        (**self).is_committed()
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()> {
        (**self).set_header(name, value)
    }

    fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()> {
        (**self).append_header(name, value)
    }

    fn remove_header(&mut self, name: &HeaderName) -> Result<()> {
        (**self).remove_header(name)
    }

    fn flusher(&mut self) -> Option<&mut dyn Flusher> {
        (**self).flusher()
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        (**self).hijacker()
    }

    fn pusher(&mut self) -> Option<&mut dyn Pusher> {
        (**self).pusher()
    }

    fn close_notifier(&mut self) -> Option<&mut dyn CloseNotifier> {
        (**self).close_notifier()
    }
}
