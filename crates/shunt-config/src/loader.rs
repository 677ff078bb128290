//! Configuration loading

use crate::{ConfigFormat, ShuntConfig};
use regex::{Captures, Regex};
use shunt_core::{Error, Result};
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load configuration from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ShuntConfig> {
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    let format = ConfigFormat::from_path(path)?;
    debug!(path = %path.display(), ?format, "loading configuration");

    load_from_str(&content, format)
}

/// Expand `${VAR}` and `${VAR:-default}` references.
///
/// An unset variable without a default is an error naming the first such
/// variable.
fn expand_env_vars(content: &str) -> Result<String> {
    let reference = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .map_err(|e| Error::Config(format!("Invalid regex: {e}")))?;

    let mut unset: Option<String> = None;
    let expanded = reference.replace_all(content, |cap: &Captures<'_>| {
        let name = &cap[1];
        match (env::var(name), cap.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                unset.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match unset {
        Some(name) => Err(Error::Config(format!(
            "Environment variable '{name}' not set and no default provided"
        ))),
        None => Ok(expanded.into_owned()),
    }
}

/// Load configuration from a string
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<ShuntConfig> {
    let expanded = expand_env_vars(content)?;

    let parsed = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded).map_err(|e| e.to_string()),
        ConfigFormat::Toml => toml::from_str(&expanded).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(&expanded).map_err(|e| e.to_string()),
    };

    parsed.map_err(|e| Error::Config(format!("Failed to parse {format:?} config: {e}")))
}

/// Load and validate configuration from a file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ShuntConfig> {
    let config = load_from_file(path)?;
    crate::validator::validate_config(&config)?;
    Ok(config)
}
