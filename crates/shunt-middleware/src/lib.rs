//! # Shunt Middleware
//!
//! Interceptors and decorators built on `shunt-core`:
//! - Access logging
//! - Conditional `304 Not Modified` short-circuit
//! - Status-based diversion to substitute handlers or static error pages
//! - Response header decorators and security headers
//! - Fixed error responses and internal rewrites

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod access_log;
pub mod builder;
pub mod headers;
pub mod internal_redirect;
pub mod never_modified;
pub mod security_headers;
pub mod serve_error;
pub mod static_errors;
pub mod status_switch;
mod strip;

pub use access_log::{tls_version_label, AccessLog, AccessLogOutput, PUSH_MARKER_HEADER};
pub use builder::MiddlewareBuilder;
pub use headers::{AddHeader, DeleteHeader, SetHeader, SetHeaders};
pub use internal_redirect::InternalRedirect;
pub use never_modified::NeverModified;
pub use security_headers::{SecurityHeaders, SecurityHeadersConfig};
pub use serve_error::{error_code, ErrorMessage, ServeError};
pub use static_errors::{
    default_error_messages, default_error_pages, ErrorPages, StaticError, StaticErrors,
};
pub use status_switch::{StatusCodeSwitch, StatusHandlers};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::access_log::{AccessLog, AccessLogOutput};
    pub use crate::builder::MiddlewareBuilder;
    pub use crate::never_modified::NeverModified;
    pub use crate::security_headers::{SecurityHeaders, SecurityHeadersConfig};
    pub use crate::static_errors::{StaticError, StaticErrors};
    pub use crate::status_switch::StatusCodeSwitch;
    pub use shunt_core::prelude::*;
}
