//! # Shunt Core
//!
//! Capability-preserving response interception.
//!
//! This crate provides the pieces every interceptor is built from:
//! - The [`ResponseWriter`] and [`Handler`] contracts
//! - The optional writer capabilities and their [`CapabilityMask`]
//! - The per-request [`Intercepted`] state machine and its [`Policy`] hook
//! - A fixed dispatch table that shows a handler exactly the capabilities
//!   of the underlying writer
//! - Error types and header helpers

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod capability;
mod dispatch;
pub mod error;
pub mod handler;
pub mod header;
pub mod intercept;
pub mod request;
pub mod testing;
pub mod writer;

pub use capability::{
    Capability, CapabilityMask, CloseNotifier, CloseSignal, Connection, Flusher, Hijacked,
    Hijacker, PushOptions, Pusher,
};
pub use error::{Error, Result};
pub use handler::{handler_fn, Handler, HandlerFn, Middleware};
pub use header::canonical_header_key;
pub use intercept::{Intercepted, Outcome, Policy, State};
pub use request::{Request, RequestBuilder, TlsInfo};
pub use writer::{Commit, ResponseWriter};

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, Version};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::capability::{Capability, CapabilityMask};
    pub use crate::error::{Error, Result};
    pub use crate::handler::{handler_fn, Handler};
    pub use crate::intercept::{Intercepted, Outcome, Policy, State};
    pub use crate::request::Request;
    pub use crate::writer::{Commit, ResponseWriter};
}
