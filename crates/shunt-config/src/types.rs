//! Configuration types

use serde::{Deserialize, Serialize};
use shunt_middleware::{AccessLogOutput, SecurityHeadersConfig};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Interceptor stack configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShuntConfig {
    /// Access log
    #[serde(default)]
    pub access_log: AccessLogConfig,

    /// Security headers; omitted means none are set
    #[serde(default)]
    pub security_headers: Option<SecurityHeadersConfig>,

    /// Response headers set on every response, name to value
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Response headers removed before the handler runs
    #[serde(default)]
    pub delete_headers: Vec<String>,

    /// Static error pages
    #[serde(default)]
    pub static_errors: StaticErrorsConfig,

    /// Answer revalidating GET/HEAD requests with 304
    #[serde(default)]
    pub never_modified: bool,

    /// Serve every request from this target instead
    #[serde(default)]
    pub internal_redirect: Option<String>,
}

/// Access log configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessLogConfig {
    /// Enable the access log
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Destination
    #[serde(default)]
    pub output: LogOutput,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output: LogOutput::default(),
        }
    }
}

/// Access log destination
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum LogOutput {
    /// Standard error
    #[default]
    Stderr,
    /// Standard output
    Stdout,
    /// Append to a file
    File {
        /// File path
        path: PathBuf,
    },
}

impl From<LogOutput> for AccessLogOutput {
    fn from(output: LogOutput) -> Self {
        match output {
            LogOutput::Stderr => AccessLogOutput::Stderr,
            LogOutput::Stdout => AccessLogOutput::Stdout,
            LogOutput::File { path } => AccessLogOutput::File(path),
        }
    }
}

/// Static error pages configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StaticErrorsConfig {
    /// Render the stock pages for 400, 403, 404, 405 and 500
    #[serde(default)]
    pub use_defaults: bool,

    /// Never append the friendly-error padding for old MSIE
    #[serde(default)]
    pub disable_padding: bool,

    /// Pages by status code; these replace stock pages
    #[serde(default)]
    pub pages: BTreeMap<u16, ErrorPageConfig>,
}

impl StaticErrorsConfig {
    /// Whether any page would be served
    pub fn is_enabled(&self) -> bool {
        self.use_defaults || !self.pages.is_empty()
    }
}

/// One error page
///
/// Exactly one of `body` and `file` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ErrorPageConfig {
    /// Inline page body
    #[serde(default)]
    pub body: Option<String>,

    /// File holding the page body
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Content type; `text/html; charset=utf-8` when omitted
    #[serde(default)]
    pub content_type: Option<String>,

    /// Extra headers sent with the page
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}
