//! Capability dispatch table
//!
//! The handler sees the state machine through a `Shim`. There is one shim
//! type per capability mask, generated from a const parameter, and a static
//! table of sixteen entry points indexed by mask bits. Each shim forwards
//! the common writer contract to the same state machine and answers
//! `Some` only from the capability accessors whose bit is set, so a writer
//! that cannot hijack is never seen as a hijacker. The shim lives on the
//! stack; dispatch allocates nothing.

use crate::capability::{
    CapabilityMask, CloseNotifier, CloseSignal, Flusher, Hijacked, Hijacker, PushOptions, Pusher,
};
use crate::handler::Handler;
use crate::intercept::Core;
use crate::request::Request;
use crate::writer::{Commit, ResponseWriter};
use crate::Result;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

type ServeFn = fn(&mut dyn Core, &dyn Handler, &Request);

static DISPATCH: [ServeFn; CapabilityMask::COMBINATIONS] = [
    serve_with::<0>,
    serve_with::<1>,
    serve_with::<2>,
    serve_with::<3>,
    serve_with::<4>,
    serve_with::<5>,
    serve_with::<6>,
    serve_with::<7>,
    serve_with::<8>,
    serve_with::<9>,
    serve_with::<10>,
    serve_with::<11>,
    serve_with::<12>,
    serve_with::<13>,
    serve_with::<14>,
    serve_with::<15>,
];

/// Call `handler` with the shim matching `mask`
pub(crate) fn dispatch(
    core: &mut dyn Core,
    mask: CapabilityMask,
    handler: &dyn Handler,
    req: &Request,
) {
    DISPATCH[mask.bits() as usize](core, handler, req)
}

fn serve_with<const MASK: u8>(core: &mut dyn Core, handler: &dyn Handler, req: &Request) {
    let mut shim = Shim::<MASK> { core };
    handler.serve(&mut shim, req);
}

struct Shim<'s, const MASK: u8> {
    core: &'s mut dyn Core,
}

impl<const MASK: u8> Shim<'_, MASK> {
    const FLUSH: bool = MASK & CapabilityMask::FLUSH.bits() != 0;
    const HIJACK: bool = MASK & CapabilityMask::HIJACK.bits() != 0;
    const PUSH: bool = MASK & CapabilityMask::PUSH.bits() != 0;
    const CLOSE_NOTIFY: bool = MASK & CapabilityMask::CLOSE_NOTIFY.bits() != 0;
}

impl<const MASK: u8> ResponseWriter for Shim<'_, MASK> {
    fn headers(&self) -> &HeaderMap {
        self.core.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.core.headers_mut()
    }

    fn write_head(&mut self, status: StatusCode) -> Commit {
        self.core.write_head(status)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.core.write(buf)
    }

    fn is_committed(&self) -> bool {
        self.core.is_committed()
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()> {
        self.core.set_header(name, value)
    }

    fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()> {
        self.core.append_header(name, value)
    }

    fn remove_header(&mut self, name: &HeaderName) -> Result<()> {
        self.core.remove_header(name)
    }

    fn flusher(&mut self) -> Option<&mut dyn Flusher> {
        if Self::FLUSH {
            Some(self)
        } else {
            None
        }
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        if Self::HIJACK {
            Some(self)
        } else {
            None
        }
    }

    fn pusher(&mut self) -> Option<&mut dyn Pusher> {
        if Self::PUSH {
            Some(self)
        } else {
            None
        }
    }

    fn close_notifier(&mut self) -> Option<&mut dyn CloseNotifier> {
        if Self::CLOSE_NOTIFY {
            Some(self)
        } else {
            None
        }
    }
}

impl<const MASK: u8> Flusher for Shim<'_, MASK> {
    fn flush(&mut self) -> Result<()> {
        self.core.flush()
    }
}

impl<const MASK: u8> Hijacker for Shim<'_, MASK> {
    fn hijack(&mut self) -> Result<Hijacked> {
        self.core.hijack()
    }
}

impl<const MASK: u8> Pusher for Shim<'_, MASK> {
    fn push(&mut self, target: &str, opts: &PushOptions) -> Result<()> {
        self.core.push(target, opts)
    }
}

impl<const MASK: u8> CloseNotifier for Shim<'_, MASK> {
    fn close_notify(&mut self) -> Result<CloseSignal> {
        self.core.close_notify()
    }
}
