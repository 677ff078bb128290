//! Per-request response state machine
//!
//! [`Intercepted`] sits between a handler and the real response writer. It
//! tracks whether the response is still open, committed, handed to a
//! substitute handler, or hijacked, and it counts what went through. What
//! an interceptor does on top of that is decided by its [`Policy`].
//!
//! Every operation is defined in every state:
//!
//! | operation       | Open                        | Committed  | Diverted        | Hijacked        |
//! |-----------------|-----------------------------|------------|-----------------|-----------------|
//! | header mutation | applied                     | `HeadersCommitted` | `Diverted` | `Hijacked`   |
//! | `write_head`    | sent, or diverted by policy | `Ignored`  | `Ignored`       | `Ignored`       |
//! | `write`         | commits 200, forwarded      | forwarded  | `Diverted`      | `Hijacked`      |
//! | capabilities    | forwarded                   | forwarded  | `Diverted`      | `Hijacked`      |

use crate::capability::{Capability, CapabilityMask, CloseSignal, Hijacked, PushOptions};
use crate::dispatch;
use crate::handler::Handler;
use crate::request::Request;
use crate::writer::{Commit, ResponseWriter};
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Lifecycle state of an intercepted response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing committed yet; headers may change
    Open,
    /// Status and headers have been sent
    Committed,
    /// A substitute handler owns the response
    Diverted,
    /// The handler took over the connection
    Hijacked,
}

/// Interceptor behaviour plugged into [`Intercepted`].
///
/// The default methods make a pure pass-through; `()` is such a policy.
pub trait Policy {
    /// Whether the first commit of `status` should be diverted
    fn should_divert(&self, status: StatusCode) -> bool {
        let _ = status;
        false
    }

    /// Take over the response for `status`.
    ///
    /// `w` is the un-wrapped writer; whatever is written to it goes to the
    /// client unchanged. Only called when [`should_divert`] returned true
    /// and nothing has been committed.
    ///
    /// [`should_divert`]: Policy::should_divert
    fn divert(&mut self, status: StatusCode, w: &mut dyn ResponseWriter, req: &Request) {
        let _ = (status, w, req);
    }

    /// Called exactly once per request, after the handler returned or
    /// while it unwinds.
    fn finish(&mut self, req: &Request, outcome: &Outcome) {
        let _ = (req, outcome);
    }
}

impl Policy for () {}

/// Summary of an intercepted response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Final status. 200 when the handler never committed, 101 after a
    /// hijack without a status, 500 when the handler panicked first.
    pub status: StatusCode,
    /// Body bytes accepted by the underlying writer
    pub bytes: u64,
    /// State the response ended in
    pub state: State,
    /// Time since the response was wrapped
    pub elapsed: Duration,
    /// False when the handler panicked
    pub completed: bool,
}

impl Outcome {
    /// Whether a substitute handler produced the response
    pub fn diverted(&self) -> bool {
        self.state == State::Diverted
    }

    /// Whether the connection was hijacked
    pub fn hijacked(&self) -> bool {
        self.state == State::Hijacked
    }
}

/// Response writer wrapper driving one request.
///
/// Created on the stack by [`Intercepted::serve`]; the handler never sees
/// it directly but through a dispatch shim exposing exactly the
/// capabilities of the wrapped writer.
pub struct Intercepted<'a, P: Policy> {
    inner: &'a mut dyn ResponseWriter,
    request: &'a Request,
    policy: P,
    mask: CapabilityMask,
    state: State,
    status: Option<StatusCode>,
    bytes: u64,
    started: Instant,
    finished: bool,
}

impl<'a, P: Policy> Intercepted<'a, P> {
    /// Wrap `inner` for one request, probing its capabilities once
    pub fn new(inner: &'a mut dyn ResponseWriter, request: &'a Request, policy: P) -> Self {
        let mask = CapabilityMask::probe(inner);
        let state = if inner.is_committed() {
            State::Committed
        } else {
            State::Open
        };

        Self {
            inner,
            request,
            policy,
            mask,
            state,
            status: None,
            bytes: 0,
            started: Instant::now(),
            finished: false,
        }
    }

    /// Run `handler` against `inner` through a fresh state machine and
    /// finalize it
    pub fn serve(
        inner: &'a mut dyn ResponseWriter,
        request: &'a Request,
        policy: P,
        handler: &dyn Handler,
    ) -> Outcome {
        let mut response = Self::new(inner, request, policy);
        response.run(handler);
        response.finish()
    }

    /// Hand the response to `handler` through the dispatch table
    pub fn run(&mut self, handler: &dyn Handler) {
        let mask = self.mask;
        let request = self.request;
        dispatch::dispatch(self, mask, handler, request);
    }

    /// Finalize the response and return its summary.
    ///
    /// A response nobody committed is committed as `200 OK` here.
    pub fn finish(mut self) -> Outcome {
        self.finalize(true)
    }

    /// Capabilities of the wrapped writer
    pub fn capabilities(&self) -> CapabilityMask {
        self.mask
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Status committed or diverted on, if any
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Body bytes accepted so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// The interceptor policy
    pub fn policy(&self) -> &P {
        &self.policy
    }

    fn finalize(&mut self, completed: bool) -> Outcome {
        if completed && self.state == State::Open {
            self.commit_inner(StatusCode::OK);
        }

        let status = match (self.status, self.state) {
            (Some(status), _) => status,
            (None, State::Hijacked) => StatusCode::SWITCHING_PROTOCOLS,
            (None, _) if !completed => StatusCode::INTERNAL_SERVER_ERROR,
            (None, _) => StatusCode::OK,
        };

        let outcome = Outcome {
            status,
            bytes: self.bytes,
            state: self.state,
            elapsed: self.started.elapsed(),
            completed,
        };

        if !self.finished {
            self.finished = true;
            self.policy.finish(self.request, &outcome);
        }
        outcome
    }

    fn commit_inner(&mut self, status: StatusCode) -> Commit {
        let commit = self.inner.write_head(status);
        self.state = State::Committed;
        self.status = Some(status);
        commit
    }

    fn check_usable(&self) -> Result<()> {
        match self.state {
            State::Diverted => Err(Error::Diverted),
            State::Hijacked => Err(Error::Hijacked),
            State::Open | State::Committed => Ok(()),
        }
    }

    fn check_capability(&self, capability: Capability) -> Result<()> {
        self.check_usable()?;
        if self.mask.contains(capability) {
            Ok(())
        } else {
            Err(Error::NotSupported(capability))
        }
    }

    fn check_headers_open(&self) -> Result<()> {
        self.check_usable()?;
        if self.state == State::Committed {
            return Err(Error::HeadersCommitted);
        }
        Ok(())
    }
}

impl<P: Policy> Drop for Intercepted<'_, P> {
    fn drop(&mut self) {
        if !self.finished {
            self.finalize(!std::thread::panicking());
        }
    }
}

impl<P: Policy> fmt::Debug for Intercepted<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intercepted")
            .field("mask", &self.mask)
            .field("state", &self.state)
            .field("status", &self.status)
            .field("bytes", &self.bytes)
            .finish()
    }
}

/// State machine operations used by the dispatch shims
pub(crate) trait Core {
    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;
    fn is_committed(&self) -> bool;
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()>;
    fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()>;
    fn remove_header(&mut self, name: &HeaderName) -> Result<()>;
    fn write_head(&mut self, status: StatusCode) -> Commit;
    fn write(&mut self, buf: &[u8]) -> Result<usize>;
    fn flush(&mut self) -> Result<()>;
    fn hijack(&mut self) -> Result<Hijacked>;
    fn push(&mut self, target: &str, opts: &PushOptions) -> Result<()>;
    fn close_notify(&mut self) -> Result<CloseSignal>;
}

impl<P: Policy> Core for Intercepted<'_, P> {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn is_committed(&self) -> bool {
        self.state != State::Open
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()> {
        self.check_headers_open()?;
        self.inner.set_header(name, value)
    }

    fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()> {
        self.check_headers_open()?;
        self.inner.append_header(name, value)
    }

    fn remove_header(&mut self, name: &HeaderName) -> Result<()> {
        self.check_headers_open()?;
        self.inner.remove_header(name)
    }

    fn write_head(&mut self, status: StatusCode) -> Commit {
        if self.state != State::Open {
            return Commit::Ignored;
        }

        if self.policy.should_divert(status) {
            debug!(status = status.as_u16(), "diverting response");
            self.state = State::Diverted;
            self.status = Some(status);
            self.policy.divert(status, &mut *self.inner, self.request);
            return Commit::Diverted;
        }

        self.commit_inner(status)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.check_usable()?;
        if self.state == State::Open {
            self.commit_inner(StatusCode::OK);
        }

        let n = self.inner.write(buf)?;
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.check_capability(Capability::Flush)?;
        if self.state == State::Open {
            self.commit_inner(StatusCode::OK);
        }

        match self.inner.flusher() {
            Some(f) => f.flush(),
            None => Err(Error::NotSupported(Capability::Flush)),
        }
    }

    fn hijack(&mut self) -> Result<Hijacked> {
        self.check_capability(Capability::Hijack)?;
        let hijacked = match self.inner.hijacker() {
            Some(h) => h.hijack()?,
            None => return Err(Error::NotSupported(Capability::Hijack)),
        };

        self.state = State::Hijacked;
        Ok(hijacked)
    }

    fn push(&mut self, target: &str, opts: &PushOptions) -> Result<()> {
        self.check_capability(Capability::Push)?;
        match self.inner.pusher() {
            Some(p) => p.push(target, opts),
            None => Err(Error::NotSupported(Capability::Push)),
        }
    }

    fn close_notify(&mut self) -> Result<CloseSignal> {
        self.check_capability(Capability::CloseNotify)?;
        match self.inner.close_notifier() {
            Some(c) => c.close_notify(),
            None => Err(Error::NotSupported(Capability::CloseNotify)),
        }
    }
}
