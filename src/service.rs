use crate::config::Policy;
use crate::error::Error;
use crate::future::ResponseFuture;
use crate::pool::BufferPool;
use http::{Request, Response};
use http_body::Body;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{BoxError, Service};
use tracing::debug;

/// A Tower service that decompresses gzip-encoded HTTP response bodies.
#[derive(Debug, Clone)]
pub struct UngzipService<S> {
    inner: S,
    policy: Arc<Policy>,
    pool: Arc<BufferPool<Vec<u8>>>,
}

impl<S> UngzipService<S> {
    /// Creates a new ungzip service wrapping the given inner service.
    pub fn new(inner: S, policy: Arc<Policy>, pool: Arc<BufferPool<Vec<u8>>>) -> Self {
        Self {
            inner,
            policy,
            pool,
        }
    }

    /// Returns the policy this service applies.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a mutable reference to the inner service.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes this service, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for UngzipService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: Into<BoxError>,
    ResBody: Body,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<crate::body::UngzipBody<ResBody>>;
    type Error = Error;
    type Future = ResponseFuture<S::Future, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(|e| Error::Service(e.into()))
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let policy = Arc::clone(&self.policy);
        let pool = Arc::clone(&self.pool);

        if !policy.matches_path(req.uri().path()) {
            debug!(path = req.uri().path(), "path excluded, response not buffered");
            return ResponseFuture::bypass(self.inner.call(req), policy, pool);
        }

        ResponseFuture::buffered(self.inner.call(req), policy, pool)
    }
}
