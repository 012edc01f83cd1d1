//! Middleware that stamps a fixed set of headers onto every request

use http::HeaderMap;
use tower::{Layer, Service};

/// [`Layer`] producing [`ExtendHeaders`]
pub struct ExtendHeadersLayer {
    headers: HeaderMap,
}

impl ExtendHeadersLayer {
    /// Creates a layer that applies `headers` to every request
    pub fn new(headers: impl Into<HeaderMap>) -> ExtendHeadersLayer {
        ExtendHeadersLayer {
            headers: headers.into(),
        }
    }
}

impl<S: Clone> Layer<S> for ExtendHeadersLayer {
    type Service = ExtendHeaders<S>;
    fn layer(&self, inner: S) -> Self::Service {
        ExtendHeaders {
            headers: self.headers.clone(),
            inner,
        }
    }
}

/// Service that sets its headers on each request before passing it on.
///
/// A header already on the request is replaced, never duplicated.
#[derive(Clone)]
pub struct ExtendHeaders<S: Clone> {
    headers: HeaderMap,
    inner: S,
}

impl<Req, S> Service<http::Request<Req>> for ExtendHeaders<S>
where
    S: Service<http::Request<Req>> + Clone,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<Req>) -> Self::Future {
        req.headers_mut().extend(self.headers.clone());
        self.inner.call(req)
    }
}
