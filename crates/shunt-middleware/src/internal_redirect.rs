//! Internal rewrite of the request target

use http::Uri;
use shunt_core::{Error, Handler, Request, ResponseWriter, Result};

/// Serves every request as if it had asked for a fixed target.
///
/// The client is not redirected; the wrapped handler sees a copy of the
/// request whose URI is replaced, query included. Method, headers and
/// connection details are kept.
#[derive(Debug, Clone)]
pub struct InternalRedirect<H> {
    handler: H,
    target: Uri,
}

impl<H: Handler> InternalRedirect<H> {
    /// Rewrite requests to `target`.
    ///
    /// Fails when `target` does not parse or carries a fragment.
    pub fn new(handler: H, target: &str) -> Result<Self> {
        if target.contains('#') {
            return Err(Error::InvalidRedirect(format!(
                "{target}: fragment must be empty"
            )));
        }
        let target = target
            .parse::<Uri>()
            .map_err(|e| Error::InvalidRedirect(format!("{target}: {e}")))?;

        Ok(Self { handler, target })
    }

    /// Rewritten target
    pub fn target(&self) -> &Uri {
        &self.target
    }
}

impl<H: Handler> Handler for InternalRedirect<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        let mut rewritten = req.clone();
        rewritten.set_uri(self.target.clone());
        self.handler.serve(w, &rewritten);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shunt_core::handler_fn;
    use shunt_core::testing::Recorder;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_rewrites_target() {
        let seen = Arc::new(Mutex::new(None));
        let record = Arc::clone(&seen);
        let inner = handler_fn(move |_, req| {
            *record.lock().unwrap() = Some((
                req.method().clone(),
                req.uri().to_string(),
                req.header_str("x-trace").map(str::to_string),
            ));
        });

        let redirect = InternalRedirect::new(inner, "/maintenance.html?from=all").unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/orders/17?page=2")
            .header("x-trace", "t-1")
            .build()
            .unwrap();
        redirect.serve(&mut Recorder::new(), &req);

        let (method, uri, trace) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(method, http::Method::POST);
        assert_eq!(uri, "/maintenance.html?from=all");
        assert_eq!(trace.as_deref(), Some("t-1"));
        assert_eq!(req.uri(), "/orders/17?page=2");
    }

    #[test]
    fn test_rejects_bad_targets() {
        let inner = handler_fn(|_, _| {});
        assert!(matches!(
            InternalRedirect::new(inner.clone(), "/page#section"),
            Err(Error::InvalidRedirect(_))
        ));
        assert!(matches!(
            InternalRedirect::new(inner, "http://[::1"),
            Err(Error::InvalidRedirect(_))
        ));
    }
}
