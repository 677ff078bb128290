//! Handler trait and adapters

use crate::request::Request;
use crate::writer::ResponseWriter;
use std::fmt;
use std::sync::Arc;

/// Something that answers a request by writing into a response writer
pub trait Handler: Send + Sync + fmt::Debug {
    /// Serve one request
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request);
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        (**self).serve(w, req)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        (**self).serve(w, req)
    }
}

/// Function that wraps a handler in another handler
pub type Middleware = Box<dyn Fn(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + Sync>;

/// Handler backed by a closure, see [`handler_fn`]
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Turn a closure into a [`Handler`]
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync,
{
    HandlerFn { f }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync,
{
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        (self.f)(w, req)
    }
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}
