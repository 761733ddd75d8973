//! Ready-made assertions.
//!
//! An [`Assertion`] receives snapshots of the request and the response of a
//! call. These helpers panic with a descriptive message when the exchange
//! does not look as expected; the panic reaches the caller unchanged.

use std::sync::Arc;

use crate::client::Assertion;
use crate::{Request, Response};

/// Wrap a closure as an [`Assertion`].
pub fn assertion<F>(f: F) -> Assertion
where
    F: Fn(Request, Response) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Assert that the response has exactly this status.
#[must_use]
pub fn status(expected: u16) -> Assertion {
    assertion(move |request, response| {
        assert!(
            response.status() == expected,
            "expected status {expected} for {} {}, got {}",
            request.method(),
            request.url(),
            response.status()
        );
    })
}

/// Assert that the response status is 2xx.
#[must_use]
pub fn success() -> Assertion {
    assertion(|request, response| {
        assert!(
            response.is_success(),
            "expected a 2xx status for {} {}, got {}",
            request.method(),
            request.url(),
            response.status()
        );
    })
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::{Headers, build_request};

    fn exchange(status_code: u16) -> (Request, Response) {
        let request = build_request("/items", "get", None, None, Headers::new()).expect("request");
        (request, Response::with_status(status_code))
    }

    #[test]
    fn status_passes_on_match() {
        let (request, response) = exchange(201);
        status(201)(request, response);
    }

    #[test]
    fn status_panics_with_context() {
        let (request, response) = exchange(404);
        let check = status(200);
        let panic = catch_unwind(AssertUnwindSafe(|| check(request, response))).expect_err("panics");
        let message = panic.downcast_ref::<String>().cloned().unwrap_or_default();
        assert_eq!(message, "expected status 200 for GET http://localhost/items, got 404");
    }

    #[test]
    fn success_checks_status_class() {
        let (request, response) = exchange(204);
        success()(request, response);

        let (request, response) = exchange(500);
        let check = success();
        assert!(catch_unwind(AssertUnwindSafe(|| check(request, response))).is_err());
    }
}
