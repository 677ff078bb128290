//! # Shunt Configuration
//!
//! Declarative interceptor stacks:
//! - Multiple formats (YAML, TOML, JSON)
//! - `${VAR}` and `${VAR:-default}` environment expansion
//! - Validation of status codes and header names and values
//! - Conversion into a [`MiddlewareBuilder`](shunt_middleware::MiddlewareBuilder)

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod loader;
pub mod stack;
pub mod types;
pub mod validator;

pub use loader::{load_config, load_from_file, load_from_str};
pub use stack::{build_stack, middleware_builder};
pub use types::{AccessLogConfig, ErrorPageConfig, LogOutput, ShuntConfig, StaticErrorsConfig};
pub use validator::validate_config;

use shunt_core::{Error, Result};
use std::path::Path;

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(Error::Config(format!(
                "{}: unsupported config format '{ext}'",
                path.display()
            ))),
            None => Err(Error::Config(format!(
                "{}: no extension to detect the config format from",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_format_from_path() {
        for (file, format) in [
            ("shunt.yaml", ConfigFormat::Yaml),
            ("shunt.yml", ConfigFormat::Yaml),
            ("shunt.toml", ConfigFormat::Toml),
            ("shunt.json", ConfigFormat::Json),
        ] {
            assert_eq!(ConfigFormat::from_path(&PathBuf::from(file)).unwrap(), format);
        }
    }

    #[test]
    fn test_unsupported_format() {
        let err = ConfigFormat::from_path(&PathBuf::from("shunt.ini")).unwrap_err();
        assert!(err.is_config());
        assert!(ConfigFormat::from_path(&PathBuf::from("shunt")).is_err());
    }
}
