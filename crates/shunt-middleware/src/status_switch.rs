//! Diversion of selected statuses to substitute handlers

use crate::strip::strip_for_substitute;
use http::StatusCode;
use shunt_core::{Handler, Intercepted, Policy, Request, ResponseWriter};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Status to substitute handler map
pub type StatusHandlers = HashMap<StatusCode, Arc<dyn Handler>>;

/// Replaces responses with a mapped status by the output of another handler.
///
/// When the wrapped handler first commits a status present in the map,
/// cache-shaping and content headers are cleared and the mapped handler
/// serves the request on the original writer. Whatever the wrapped handler
/// writes afterwards is rejected with [`Error::Diverted`]. A status
/// committed implicitly by a body write is never diverted.
///
/// [`Error::Diverted`]: shunt_core::Error::Diverted
pub struct StatusCodeSwitch<H> {
    handler: H,
    handlers: Arc<StatusHandlers>,
}

impl<H: Handler> StatusCodeSwitch<H> {
    /// Wrap `handler`, diverting the statuses in `handlers`
    pub fn new(handler: H, handlers: impl Into<Arc<StatusHandlers>>) -> Self {
        Self {
            handler,
            handlers: handlers.into(),
        }
    }

    /// Statuses that are diverted
    pub fn statuses(&self) -> impl Iterator<Item = StatusCode> + '_ {
        self.handlers.keys().copied()
    }
}

impl<H: fmt::Debug> fmt::Debug for StatusCodeSwitch<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statuses: Vec<_> = self.handlers.keys().map(|s| s.as_u16()).collect();
        statuses.sort_unstable();
        f.debug_struct("StatusCodeSwitch")
            .field("handler", &self.handler)
            .field("statuses", &statuses)
            .finish()
    }
}

impl<H: Handler> Handler for StatusCodeSwitch<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        let policy = Switch {
            handlers: &self.handlers,
        };
        Intercepted::serve(w, req, policy, &self.handler);
    }
}

struct Switch<'m> {
    handlers: &'m StatusHandlers,
}

impl Policy for Switch<'_> {
    fn should_divert(&self, status: StatusCode) -> bool {
        self.handlers.contains_key(&status)
    }

    fn divert(&mut self, status: StatusCode, w: &mut dyn ResponseWriter, req: &Request) {
        if let Some(substitute) = self.handlers.get(&status) {
            strip_for_substitute(w.headers_mut());
            substitute.serve(w, req);
        }
    }
}
