//! Middleware stack builder
//!
//! Layers wrap the handler in the order they were added: the first layer
//! added is the outermost and sees the request first.

use crate::*;
use shunt_core::{Handler, Middleware, Result};
use std::fmt;
use std::sync::Arc;

enum Layer {
    AccessLog(AccessLogOutput),
    SecurityHeaders(SecurityHeadersConfig),
    SetHeader(String, String),
    AddHeader(String, String),
    DeleteHeader(String),
    SetHeaders(Vec<(String, String)>),
    StaticErrors {
        pages: Arc<ErrorPages>,
        disable_padding: bool,
    },
    StatusCodeSwitch(Arc<StatusHandlers>),
    NeverModified,
    InternalRedirect(String),
    Custom(Middleware),
}

impl Layer {
    fn name(&self) -> &'static str {
        match self {
            Layer::AccessLog(_) => "access_log",
            Layer::SecurityHeaders(_) => "security_headers",
            Layer::SetHeader(..) => "set_header",
            Layer::AddHeader(..) => "add_header",
            Layer::DeleteHeader(_) => "delete_header",
            Layer::SetHeaders(_) => "set_headers",
            Layer::StaticErrors { .. } => "static_errors",
            Layer::StatusCodeSwitch(_) => "status_code_switch",
            Layer::NeverModified => "never_modified",
            Layer::InternalRedirect(_) => "internal_redirect",
            Layer::Custom(_) => "custom",
        }
    }

    fn wrap(self, inner: Arc<dyn Handler>) -> Result<Arc<dyn Handler>> {
        Ok(match self {
            Layer::AccessLog(output) => Arc::new(AccessLog::new(inner, output)?),
            Layer::SecurityHeaders(config) => Arc::new(SecurityHeaders::new(inner, &config)?),
            Layer::SetHeader(name, value) => Arc::new(SetHeader::new(inner, &name, &value)?),
            Layer::AddHeader(name, value) => Arc::new(AddHeader::new(inner, &name, &value)?),
            Layer::DeleteHeader(name) => Arc::new(DeleteHeader::new(inner, &name)?),
            Layer::SetHeaders(headers) => Arc::new(SetHeaders::new(
                inner,
                headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            )?),
            Layer::StaticErrors {
                pages,
                disable_padding,
            } => {
                let errors = StaticErrors::new(inner, pages);
                if disable_padding {
                    Arc::new(errors.disable_padding())
                } else {
                    Arc::new(errors)
                }
            }
            Layer::StatusCodeSwitch(handlers) => Arc::new(StatusCodeSwitch::new(inner, handlers)),
            Layer::NeverModified => Arc::new(NeverModified::new(inner)),
            Layer::InternalRedirect(target) => Arc::new(InternalRedirect::new(inner, &target)?),
            Layer::Custom(middleware) => middleware(inner),
        })
    }
}

/// Middleware stack builder
///
/// Names, values and targets are validated when the stack is built.
///
/// # Example
///
/// ```
/// use shunt_core::testing::MockHandler;
/// use shunt_core::StatusCode;
/// use shunt_middleware::MiddlewareBuilder;
///
/// let app = MiddlewareBuilder::new()
///     .with_security_headers()
///     .with_default_error_pages()
///     .with_never_modified()
///     .build(MockHandler::new(StatusCode::OK))?;
/// # Ok::<(), shunt_core::Error>(())
/// ```
#[derive(Default)]
pub struct MiddlewareBuilder {
    layers: Vec<Layer>,
}

impl MiddlewareBuilder {
    /// Create a new middleware builder
    #[must_use]
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Log requests to standard error
    #[must_use]
    pub fn with_access_log(self) -> Self {
        self.with_access_log_output(AccessLogOutput::Stderr)
    }

    /// Log requests to `output`
    #[must_use]
    pub fn with_access_log_output(mut self, output: AccessLogOutput) -> Self {
        self.layers.push(Layer::AccessLog(output));
        self
    }

    /// Add default security headers
    #[must_use]
    pub fn with_security_headers(self) -> Self {
        self.with_security_headers_config(SecurityHeadersConfig::default())
    }

    /// Add security headers with custom configuration
    #[must_use]
    pub fn with_security_headers_config(mut self, config: SecurityHeadersConfig) -> Self {
        self.layers.push(Layer::SecurityHeaders(config));
        self
    }

    /// Replace a response header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.layers.push(Layer::SetHeader(name.into(), value.into()));
        self
    }

    /// Append a response header value
    #[must_use]
    pub fn with_added_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.layers.push(Layer::AddHeader(name.into(), value.into()));
        self
    }

    /// Remove a response header before the handler runs
    #[must_use]
    pub fn without_header(mut self, name: impl Into<String>) -> Self {
        self.layers.push(Layer::DeleteHeader(name.into()));
        self
    }

    /// Replace a set of response headers
    #[must_use]
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.layers.push(Layer::SetHeaders(headers));
        self
    }

    /// Serve precomputed pages for error statuses
    #[must_use]
    pub fn with_error_pages(mut self, pages: impl Into<Arc<ErrorPages>>) -> Self {
        self.layers.push(Layer::StaticErrors {
            pages: pages.into(),
            disable_padding: false,
        });
        self
    }

    /// Serve precomputed pages without the friendly-error padding
    #[must_use]
    pub fn with_error_pages_unpadded(mut self, pages: impl Into<Arc<ErrorPages>>) -> Self {
        self.layers.push(Layer::StaticErrors {
            pages: pages.into(),
            disable_padding: true,
        });
        self
    }

    /// Serve the stock error pages
    #[must_use]
    pub fn with_default_error_pages(self) -> Self {
        self.with_error_pages(default_error_pages())
    }

    /// Divert statuses to substitute handlers
    #[must_use]
    pub fn with_status_handlers(mut self, handlers: impl Into<Arc<StatusHandlers>>) -> Self {
        self.layers.push(Layer::StatusCodeSwitch(handlers.into()));
        self
    }

    /// Answer revalidations with 304
    #[must_use]
    pub fn with_never_modified(mut self) -> Self {
        self.layers.push(Layer::NeverModified);
        self
    }

    /// Serve every request from `target`
    #[must_use]
    pub fn with_internal_redirect(mut self, target: impl Into<String>) -> Self {
        self.layers.push(Layer::InternalRedirect(target.into()));
        self
    }

    /// Add custom middleware
    #[must_use]
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.layers.push(Layer::Custom(middleware));
        self
    }

    /// Wrap `handler` in every layer
    pub fn build(self, handler: impl Handler + 'static) -> Result<Arc<dyn Handler>> {
        let mut stack: Arc<dyn Handler> = Arc::new(handler);
        for layer in self.layers.into_iter().rev() {
            stack = layer.wrap(stack)?;
        }
        Ok(stack)
    }

    /// Get the number of layers
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Check if no layer was added
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl fmt::Debug for MiddlewareBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareBuilder")
            .field(
                "layers",
                &self.layers.iter().map(Layer::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
