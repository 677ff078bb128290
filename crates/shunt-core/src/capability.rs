//! Optional response writer capabilities
//!
//! A response writer may support any subset of four optional behaviours.
//! Which ones a concrete writer supports is a property of its type, so the
//! set is probed once per request into a [`CapabilityMask`] and never
//! re-examined while the request is in flight.

use crate::writer::ResponseWriter;
use crate::Result;
use bytes::Bytes;
use http::{HeaderMap, Method};
use std::fmt;
use std::io;
use tokio::sync::watch;

/// One optional response writer capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Push buffered bytes to the client now
    Flush,
    /// Take over the raw connection
    Hijack,
    /// Start a server push
    Push,
    /// Observe client disconnection
    CloseNotify,
}

impl Capability {
    /// All capabilities, in mask bit order
    pub const ALL: [Capability; 4] = [
        Capability::Flush,
        Capability::Hijack,
        Capability::Push,
        Capability::CloseNotify,
    ];

    const fn bit(self) -> u8 {
        match self {
            Capability::Flush => CapabilityMask::FLUSH.0,
            Capability::Hijack => CapabilityMask::HIJACK.0,
            Capability::Push => CapabilityMask::PUSH.0,
            Capability::CloseNotify => CapabilityMask::CLOSE_NOTIFY.0,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flush => write!(f, "flush"),
            Self::Hijack => write!(f, "hijack"),
            Self::Push => write!(f, "push"),
            Self::CloseNotify => write!(f, "close-notify"),
        }
    }
}

/// Set of capabilities a response writer supports
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilityMask(u8);

impl CapabilityMask {
    /// No optional capability
    pub const NONE: CapabilityMask = CapabilityMask(0);
    /// [`Capability::Flush`]
    pub const FLUSH: CapabilityMask = CapabilityMask(1 << 0);
    /// [`Capability::Hijack`]
    pub const HIJACK: CapabilityMask = CapabilityMask(1 << 1);
    /// [`Capability::Push`]
    pub const PUSH: CapabilityMask = CapabilityMask(1 << 2);
    /// [`Capability::CloseNotify`]
    pub const CLOSE_NOTIFY: CapabilityMask = CapabilityMask(1 << 3);
    /// Every capability
    pub const ALL: CapabilityMask = CapabilityMask(0b1111);

    /// Number of distinct masks
    pub const COMBINATIONS: usize = 16;

    /// Probe a writer for the capabilities it implements.
    ///
    /// This is the only place capability accessors are consulted to build
    /// a mask; callers keep the result for the rest of the request.
    pub fn probe(writer: &mut dyn ResponseWriter) -> Self {
        let mut mask = Self::NONE;
        if writer.flusher().is_some() {
            mask = mask | Self::FLUSH;
        }
        if writer.hijacker().is_some() {
            mask = mask | Self::HIJACK;
        }
        if writer.pusher().is_some() {
            mask = mask | Self::PUSH;
        }
        if writer.close_notifier().is_some() {
            mask = mask | Self::CLOSE_NOTIFY;
        }
        mask
    }

    /// Build a mask from raw bits, ignoring unknown bits
    pub const fn from_bits(bits: u8) -> Self {
        CapabilityMask(bits & Self::ALL.0)
    }

    /// Raw bits, always below [`Self::COMBINATIONS`]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether `capability` is in the set
    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Iterate over the capabilities in the set
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |c| self.contains(*c))
    }
}

impl std::ops::BitOr for CapabilityMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        CapabilityMask(self.0 | rhs.0)
    }
}

impl From<Capability> for CapabilityMask {
    fn from(capability: Capability) -> Self {
        CapabilityMask(capability.bit())
    }
}

impl FromIterator<Capability> for CapabilityMask {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::NONE, |mask, c| mask | Self::from(c))
    }
}

impl fmt::Debug for CapabilityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Writer that can push partially written output downstream
pub trait Flusher {
    /// Send any buffered data to the client
    fn flush(&mut self) -> Result<()>;
}

/// Writer that can hand over its connection
pub trait Hijacker {
    /// Take exclusive ownership of the connection.
    ///
    /// After a successful hijack the writer must not be used again.
    fn hijack(&mut self) -> Result<Hijacked>;
}

/// Writer that can initiate server pushes
pub trait Pusher {
    /// Push `target` to the client ahead of it being requested
    fn push(&mut self, target: &str, opts: &PushOptions) -> Result<()>;
}

/// Writer that can report client disconnection
pub trait CloseNotifier {
    /// Signal that flips to `true` once the client is gone
    fn close_notify(&mut self) -> Result<CloseSignal>;
}

/// Level-triggered disconnection signal
pub type CloseSignal = watch::Receiver<bool>;

/// Raw connection handed out by a hijack
pub trait Connection: io::Read + io::Write + Send {}

impl<T: io::Read + io::Write + Send> Connection for T {}

/// Result of a successful hijack
pub struct Hijacked {
    /// The raw connection
    pub conn: Box<dyn Connection>,
    /// Bytes already read from the connection but not yet consumed
    pub buffered: Bytes,
}

impl fmt::Debug for Hijacked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hijacked")
            .field("buffered", &self.buffered.len())
            .finish_non_exhaustive()
    }
}

/// Options for a server push
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Method of the promised request, GET or HEAD
    pub method: Method,
    /// Headers of the promised request
    pub headers: HeaderMap,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
        }
    }
}
