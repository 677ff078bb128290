//! Turning a [`ShuntConfig`] into a handler stack
//!
//! Layers are added outermost first: access log, security headers, set
//! headers, deleted headers, error pages, never-modified, internal
//! redirect. Status handlers cannot be expressed in a file; add them to
//! the returned builder with
//! [`with_status_handlers`](MiddlewareBuilder::with_status_handlers).

use crate::{ErrorPageConfig, ShuntConfig, StaticErrorsConfig};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use shunt_core::header::{parse_header_name, parse_header_value};
use shunt_core::{Error, Handler, Result};
use shunt_middleware::{default_error_pages, ErrorPages, MiddlewareBuilder, StaticError};
use std::fs;
use std::sync::Arc;
use tracing::{debug, info};

/// Validate `config` and translate it into a [`MiddlewareBuilder`].
///
/// Error page files are read here, once.
pub fn middleware_builder(config: &ShuntConfig) -> Result<MiddlewareBuilder> {
    crate::validator::validate_config(config)?;

    let mut builder = MiddlewareBuilder::new();

    if config.access_log.enabled {
        builder = builder.with_access_log_output(config.access_log.output.clone().into());
    }

    if let Some(ref security) = config.security_headers {
        builder = builder.with_security_headers_config(security.clone());
    }

    if !config.headers.is_empty() {
        builder = builder.with_headers(
            config
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
    }

    for name in &config.delete_headers {
        builder = builder.without_header(name.clone());
    }

    if config.static_errors.is_enabled() {
        let pages = error_pages(&config.static_errors)?;
        builder = if config.static_errors.disable_padding {
            builder.with_error_pages_unpadded(pages)
        } else {
            builder.with_error_pages(pages)
        };
    }

    if config.never_modified {
        builder = builder.with_never_modified();
    }

    if let Some(ref target) = config.internal_redirect {
        builder = builder.with_internal_redirect(target.clone());
    }

    info!(?builder, "interceptor stack configured");
    Ok(builder)
}

/// Wrap `handler` in the stack described by `config`
pub fn build_stack(config: &ShuntConfig, handler: impl Handler + 'static) -> Result<Arc<dyn Handler>> {
    middleware_builder(config)?.build(handler)
}

fn error_pages(config: &StaticErrorsConfig) -> Result<ErrorPages> {
    let mut pages = if config.use_defaults {
        default_error_pages()
    } else {
        ErrorPages::new()
    };

    for (&code, page) in &config.pages {
        let status = StatusCode::from_u16(code).map_err(|_| Error::InvalidStatus(code))?;
        pages.insert(status, static_error(code, page)?);
    }

    Ok(pages)
}

fn static_error(code: u16, page: &ErrorPageConfig) -> Result<StaticError> {
    let body = match (&page.body, &page.file) {
        (Some(body), _) => Bytes::from(body.clone()),
        (None, Some(path)) => {
            debug!(status = code, path = %path.display(), "reading error page");
            let data = fs::read(path).map_err(|e| {
                Error::Config(format!(
                    "error page {code}: failed to read {}: {e}",
                    path.display()
                ))
            })?;
            Bytes::from(data)
        }
        (None, None) => {
            return Err(Error::Config(format!(
                "error page {code}: one of body or file is required"
            )));
        }
    };

    let mut error = StaticError::new(body);
    if let Some(ref content_type) = page.content_type {
        error = error.with_header(CONTENT_TYPE, parse_header_value("content-type", content_type)?);
    }
    for (name, value) in &page.headers {
        error = error.with_header(parse_header_name(name)?, parse_header_value(name, value)?);
    }

    Ok(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{load_from_str, ConfigFormat, LogOutput};
    use shunt_core::testing::{MockHandler, Recorder};
    use shunt_core::Request;
    use shunt_middleware::StatusHandlers;
    use std::collections::HashMap;
    use std::io::Write;

    fn quiet() -> ShuntConfig {
        let mut config = ShuntConfig::default();
        config.access_log.enabled = false;
        config
    }

    fn get(uri: &str) -> Request {
        Request::builder().uri(uri).build().unwrap()
    }

    #[test]
    fn test_empty_config_builds_empty_stack() {
        assert!(middleware_builder(&quiet()).unwrap().is_empty());
        assert_eq!(middleware_builder(&ShuntConfig::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_layer_order() {
        let yaml = r#"
access_log:
  output:
    type: stdout
security_headers: {}
headers:
  Server: shunt
delete_headers: [X-Powered-By]
static_errors:
  use_defaults: true
never_modified: true
internal_redirect: /index.html
"#;
        let config = load_from_str(yaml, ConfigFormat::Yaml).unwrap();
        let builder = middleware_builder(&config).unwrap();
        assert_eq!(
            format!("{builder:?}"),
            "MiddlewareBuilder { layers: [\"access_log\", \"security_headers\", \
             \"set_headers\", \"delete_header\", \"static_errors\", \"never_modified\", \
             \"internal_redirect\"] }"
        );
        assert_eq!(config.access_log.output, LogOutput::Stdout);
    }

    #[test]
    fn test_configured_page_is_served() {
        let mut config = quiet();
        config.static_errors.pages.insert(
            503,
            ErrorPageConfig {
                body: Some("back soon".to_string()),
                content_type: Some("text/plain; charset=utf-8".to_string()),
                headers: [("Retry-After".to_string(), "120".to_string())].into(),
                ..Default::default()
            },
        );
        config.static_errors.disable_padding = true;

        let app = build_stack(&config, MockHandler::new(StatusCode::SERVICE_UNAVAILABLE)).unwrap();
        let mut rec = Recorder::new();
        app.serve(&mut rec, &get("/"));

        assert_eq!(rec.code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(rec.body_str(), "back soon");
        let sent = rec.sent_headers();
        assert_eq!(sent["content-type"], "text/plain; charset=utf-8");
        assert_eq!(sent["retry-after"], "120");
    }

    #[test]
    fn test_configured_page_replaces_stock_page() {
        let mut config = quiet();
        config.static_errors.use_defaults = true;
        config.static_errors.pages.insert(404, ErrorPageConfig {
            body: Some("custom".to_string()),
            ..Default::default()
        });

        let pages = error_pages(&config.static_errors).unwrap();
        assert_eq!(pages.len(), default_error_pages().len());
        assert_eq!(pages[&StatusCode::NOT_FOUND].body, "custom");
        assert!(pages.contains_key(&StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_page_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<h1>gone</h1>").unwrap();

        let page = ErrorPageConfig {
            file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(static_error(410, &page).unwrap().body, "<h1>gone</h1>");

        let missing = ErrorPageConfig {
            file: Some("/nonexistent/410.html".into()),
            ..Default::default()
        };
        assert!(static_error(410, &missing).unwrap_err().is_config());
    }

    #[test]
    fn test_status_handlers_added_in_code() {
        let mut config = quiet();
        config.headers.insert("X-Edge".to_string(), "1".to_string());

        let substitute = MockHandler::new(StatusCode::NOT_FOUND).body("elsewhere");
        let mut handlers: StatusHandlers = HashMap::new();
        handlers.insert(StatusCode::NOT_FOUND, Arc::new(substitute.clone()));

        let app = middleware_builder(&config)
            .unwrap()
            .with_status_handlers(handlers)
            .build(MockHandler::new(StatusCode::NOT_FOUND))
            .unwrap();
        let mut rec = Recorder::new();
        app.serve(&mut rec, &get("/missing"));

        assert_eq!(substitute.calls(), 1);
        assert_eq!(rec.body_str(), "elsewhere");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = quiet();
        config.headers.insert("Bad Name".to_string(), "x".to_string());
        assert!(middleware_builder(&config).unwrap_err().is_config());
    }

    #[test]
    fn test_never_modified_from_config() {
        let mut config = quiet();
        config.never_modified = true;
        let inner = MockHandler::new(StatusCode::OK);
        let app = build_stack(&config, inner.clone()).unwrap();

        let req = Request::builder()
            .uri("/app.js")
            .header("if-modified-since", "Sun, 06 Nov 1994 08:49:37 GMT")
            .build()
            .unwrap();
        let mut rec = Recorder::new();
        app.serve(&mut rec, &req);
        assert_eq!(rec.code(), StatusCode::NOT_MODIFIED);
        assert_eq!(inner.calls(), 0);
    }
}
