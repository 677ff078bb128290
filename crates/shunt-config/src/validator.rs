//! Configuration validation

use crate::{ErrorPageConfig, LogOutput, ShuntConfig};
use http::StatusCode;
use shunt_core::header::{parse_header_name, parse_header_value};
use shunt_core::{handler_fn, Error, Result};
use shunt_middleware::InternalRedirect;

/// Validate configuration
pub fn validate_config(config: &ShuntConfig) -> Result<()> {
    validate_access_log(config)?;
    validate_headers(config)?;
    validate_static_errors(config)?;

    if let Some(ref target) = config.internal_redirect {
        InternalRedirect::new(handler_fn(|_, _| {}), target)?;
    }

    Ok(())
}

fn validate_access_log(config: &ShuntConfig) -> Result<()> {
    if let LogOutput::File { ref path } = config.access_log.output {
        if path.as_os_str().is_empty() {
            return Err(Error::Config("access_log file path cannot be empty".to_string()));
        }
        if !config.access_log.enabled {
            tracing::warn!(path = %path.display(), "Access log file configured but logging is disabled");
        }
    }

    Ok(())
}

fn validate_headers(config: &ShuntConfig) -> Result<()> {
    for (name, value) in &config.headers {
        parse_header_name(name)?;
        parse_header_value(name, value)?;
    }

    for name in &config.delete_headers {
        parse_header_name(name)?;
        if config.headers.keys().any(|set| set.eq_ignore_ascii_case(name)) {
            tracing::warn!(header = %name, "Header is both set and deleted");
        }
    }

    if let Some(ref security) = config.security_headers {
        security.to_headers()?;
    }

    Ok(())
}

fn validate_static_errors(config: &ShuntConfig) -> Result<()> {
    for (&code, page) in &config.static_errors.pages {
        let status = StatusCode::from_u16(code).map_err(|_| Error::InvalidStatus(code))?;

        if !status.is_client_error() && !status.is_server_error() {
            tracing::warn!(status = code, "Error page configured for a non-error status");
        }

        validate_page(code, page)?;
    }

    Ok(())
}

fn validate_page(code: u16, page: &ErrorPageConfig) -> Result<()> {
    match (&page.body, &page.file) {
        (Some(_), None) | (None, Some(_)) => {}
        (Some(_), Some(_)) => {
            return Err(Error::Config(format!(
                "error page {code}: body and file are mutually exclusive"
            )));
        }
        (None, None) => {
            return Err(Error::Config(format!(
                "error page {code}: one of body or file is required"
            )));
        }
    }

    if let Some(ref content_type) = page.content_type {
        parse_header_value("content-type", content_type)?;
    }

    for (name, value) in &page.headers {
        parse_header_name(name)?;
        parse_header_value(name, value)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shunt_middleware::SecurityHeadersConfig;
    use std::path::PathBuf;

    fn page(body: &str) -> ErrorPageConfig {
        ErrorPageConfig {
            body: Some(body.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ShuntConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_status_code() {
        for code in [0, 99, 1000] {
            let mut config = ShuntConfig::default();
            config.static_errors.pages.insert(code, page("x"));
            let err = validate_config(&config).unwrap_err();
            assert!(matches!(err, Error::InvalidStatus(c) if c == code));
        }
    }

    #[test]
    fn test_non_error_status_is_allowed() {
        let mut config = ShuntConfig::default();
        config.static_errors.pages.insert(299, page("x"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_page_source_is_exclusive() {
        let mut config = ShuntConfig::default();
        config.static_errors.pages.insert(
            404,
            ErrorPageConfig {
                body: Some("x".to_string()),
                file: Some(PathBuf::from("/srv/404.html")),
                ..Default::default()
            },
        );
        assert!(validate_config(&config).unwrap_err().is_config());

        config
            .static_errors
            .pages
            .insert(404, ErrorPageConfig::default());
        assert!(validate_config(&config).unwrap_err().is_config());
    }

    #[test]
    fn test_invalid_header_name() {
        let mut config = ShuntConfig::default();
        config
            .headers
            .insert("X Bad".to_string(), "value".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(Error::InvalidHeaderName(name)) if name == "X Bad"
        ));

        let mut config = ShuntConfig::default();
        config.delete_headers.push("".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(Error::InvalidHeaderName(_))
        ));
    }

    #[test]
    fn test_invalid_header_value() {
        let mut config = ShuntConfig::default();
        config
            .headers
            .insert("X-Note".to_string(), "line\nbreak".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(Error::InvalidHeaderValue { name }) if name == "X-Note"
        ));

        let mut config = ShuntConfig::default();
        let mut bad = page("x");
        bad.content_type = Some("text/html\r\n".to_string());
        config.static_errors.pages.insert(500, bad);
        assert!(matches!(
            validate_config(&config),
            Err(Error::InvalidHeaderValue { .. })
        ));

        let mut config = ShuntConfig::default();
        config.security_headers = Some(SecurityHeadersConfig {
            csp: Some("default-src\0".to_string()),
            ..Default::default()
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_redirect() {
        let mut config = ShuntConfig::default();
        config.internal_redirect = Some("/index.html#top".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(Error::InvalidRedirect(_))
        ));

        config.internal_redirect = Some("/index.html?lang=en".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_log_path() {
        let mut config = ShuntConfig::default();
        config.access_log.output = LogOutput::File {
            path: PathBuf::new(),
        };
        assert!(validate_config(&config).unwrap_err().is_config());
    }
}
