//! Security headers middleware
//!
//! Sets browser hardening headers (framing, MIME sniffing, referrer,
//! optionally CSP and HSTS) before the wrapped handler runs.

use http::header::{
    CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
    X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use shunt_core::header::parse_header_value;
use shunt_core::{Handler, Request, ResponseWriter, Result};
use tracing::debug;

/// Security headers configuration
///
/// `None` leaves a header unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityHeadersConfig {
    /// Strict-Transport-Security header
    /// Example: "max-age=15768000; includeSubDomains"
    pub hsts: Option<String>,

    /// Content-Security-Policy header
    /// Example: "default-src 'none'; sandbox"
    pub csp: Option<String>,

    /// X-Frame-Options header
    /// Values: "DENY", "SAMEORIGIN"
    pub frame_options: Option<String>,

    /// X-Content-Type-Options header
    pub content_type_options: Option<String>,

    /// X-XSS-Protection header
    pub xss_protection: Option<String>,

    /// Referrer-Policy header
    pub referrer_policy: Option<String>,

    /// Permissions-Policy header
    /// Example: "geolocation=(), microphone=()"
    pub permissions_policy: Option<String>,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            hsts: None,
            csp: None,
            frame_options: Some("SAMEORIGIN".to_string()),
            content_type_options: Some("nosniff".to_string()),
            xss_protection: Some("1; mode=block".to_string()),
            referrer_policy: Some("strict-origin-when-cross-origin".to_string()),
            permissions_policy: None,
        }
    }
}

impl SecurityHeadersConfig {
    /// Locked-down preset for production HTTPS sites
    pub fn strict() -> Self {
        Self {
            hsts: Some("max-age=63072000; includeSubDomains; preload".to_string()),
            csp: Some("default-src 'none'; sandbox".to_string()),
            frame_options: Some("DENY".to_string()),
            referrer_policy: Some("no-referrer".to_string()),
            permissions_policy: Some(
                "geolocation=(), microphone=(), camera=(), payment=()".to_string(),
            ),
            ..Self::default()
        }
    }

    /// Relaxed preset for development
    pub fn permissive() -> Self {
        Self {
            csp: Some("default-src 'self' 'unsafe-inline' 'unsafe-eval'".to_string()),
            referrer_policy: Some("origin-when-cross-origin".to_string()),
            ..Self::default()
        }
    }

    /// Validate and convert into header pairs
    pub fn to_headers(&self) -> Result<Vec<(HeaderName, HeaderValue)>> {
        let fields = [
            (X_FRAME_OPTIONS, &self.frame_options),
            (X_XSS_PROTECTION, &self.xss_protection),
            (X_CONTENT_TYPE_OPTIONS, &self.content_type_options),
            (REFERRER_POLICY, &self.referrer_policy),
            (CONTENT_SECURITY_POLICY, &self.csp),
            (STRICT_TRANSPORT_SECURITY, &self.hsts),
            (HeaderName::from_static("permissions-policy"), &self.permissions_policy),
        ];

        fields
            .into_iter()
            .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
            .map(|(name, value)| {
                let value = parse_header_value(name.as_str(), value)?;
                Ok((name, value))
            })
            .collect()
    }
}

/// Security headers middleware
///
/// # Example
///
/// ```
/// use shunt_core::testing::MockHandler;
/// use shunt_core::StatusCode;
/// use shunt_middleware::{SecurityHeaders, SecurityHeadersConfig};
///
/// let secured = SecurityHeaders::new(
///     MockHandler::new(StatusCode::OK),
///     &SecurityHeadersConfig::strict(),
/// )?;
/// # Ok::<(), shunt_core::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct SecurityHeaders<H> {
    handler: H,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl<H: Handler> SecurityHeaders<H> {
    /// Wrap `handler` with the headers described by `config`
    pub fn new(handler: H, config: &SecurityHeadersConfig) -> Result<Self> {
        Ok(Self {
            handler,
            headers: config.to_headers()?,
        })
    }

    /// Wrap `handler` with the default headers
    pub fn with_defaults(handler: H) -> Result<Self> {
        Self::new(handler, &SecurityHeadersConfig::default())
    }
}

impl<H: Handler> Handler for SecurityHeaders<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        for (name, value) in &self.headers {
            if let Err(e) = w.set_header(name.clone(), value.clone()) {
                debug!(header = %name, error = %e, "security header not set");
                break;
            }
        }
        self.handler.serve(w, req);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shunt_core::testing::{MockHandler, Recorder};
    use shunt_core::StatusCode;

    fn serve(config: &SecurityHeadersConfig) -> Recorder {
        let h = SecurityHeaders::new(MockHandler::new(StatusCode::OK), config).unwrap();
        let mut rec = Recorder::new();
        h.serve(&mut rec, &Request::builder().build().unwrap());
        rec
    }

    #[test]
    fn test_default_security_headers() {
        let rec = serve(&SecurityHeadersConfig::default());
        let sent = rec.sent_headers();

        assert_eq!(sent[X_FRAME_OPTIONS], "SAMEORIGIN");
        assert_eq!(sent[X_XSS_PROTECTION], "1; mode=block");
        assert_eq!(sent[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(sent[REFERRER_POLICY], "strict-origin-when-cross-origin");
        assert!(!sent.contains_key(STRICT_TRANSPORT_SECURITY));
        assert!(!sent.contains_key(CONTENT_SECURITY_POLICY));
    }

    #[test]
    fn test_strict_security_headers() {
        let rec = serve(&SecurityHeadersConfig::strict());
        let sent = rec.sent_headers();

        let hsts = sent[STRICT_TRANSPORT_SECURITY].to_str().unwrap();
        assert!(hsts.contains("max-age=63072000"));
        assert!(hsts.contains("preload"));
        assert_eq!(sent[CONTENT_SECURITY_POLICY], "default-src 'none'; sandbox");
        assert_eq!(sent[X_FRAME_OPTIONS], "DENY");
        assert!(sent.contains_key("permissions-policy"));
    }

    #[test]
    fn test_permissive_security_headers() {
        let rec = serve(&SecurityHeadersConfig::permissive());
        let sent = rec.sent_headers();

        assert!(!sent.contains_key(STRICT_TRANSPORT_SECURITY));
        let csp = sent[CONTENT_SECURITY_POLICY].to_str().unwrap();
        assert!(csp.contains("unsafe-inline"));
    }

    #[test]
    fn test_custom_security_headers() {
        let config = SecurityHeadersConfig {
            hsts: Some("max-age=0".to_string()),
            xss_protection: None,
            ..SecurityHeadersConfig::default()
        };
        let rec = serve(&config);
        let sent = rec.sent_headers();

        assert_eq!(sent[STRICT_TRANSPORT_SECURITY], "max-age=0");
        assert!(!sent.contains_key(X_XSS_PROTECTION));
    }

    #[test]
    fn test_invalid_value_rejected() {
        let config = SecurityHeadersConfig {
            csp: Some("default-src\n'none'".to_string()),
            ..SecurityHeadersConfig::default()
        };
        let err = SecurityHeaders::new(MockHandler::new(StatusCode::OK), &config).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: SecurityHeadersConfig =
            serde_json::from_str(r#"{"hsts": "max-age=15768000"}"#).unwrap();
        assert_eq!(config.hsts.as_deref(), Some("max-age=15768000"));
        assert_eq!(config.frame_options.as_deref(), Some("SAMEORIGIN"));
    }
}
