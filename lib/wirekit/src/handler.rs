//! In-process terminal handlers.

use std::future::{Ready, ready};
use std::task::{Context, Poll};

use tower_service::Service;

use crate::{Request, Response, Result};

/// Adapt a synchronous function into a terminal handler.
///
/// The function runs inline on every call; nothing leaves the process.
///
/// # Example
///
/// ```
/// use wirekit::{Headers, Request, Response, handler_fn};
///
/// let app = handler_fn(|request: Request| {
///     let greeting = format!("hello {}", request.path());
///     Ok(Response::new(200, [("Content-Type", "text/plain")], greeting))
/// });
/// # let _ = app;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Result<Response> + Clone + Send + 'static,
{
    HandlerFn { f }
}

/// Terminal handler returned by [`handler_fn`].
#[derive(Clone, Copy)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

impl<F> Service<Request> for HandlerFn<F>
where
    F: Fn(Request) -> Result<Response>,
{
    type Response = Response;
    type Error = crate::Error;
    type Future = Ready<Result<Response>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        ready((self.f)(request))
    }
}
