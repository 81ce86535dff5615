use crate::config::{Policy, UngzipConfig};
use crate::error::ConfigError;
use crate::pool::BufferPool;
use crate::service::UngzipService;
use std::sync::Arc;
use tower::Layer;

/// A Tower layer that decompresses gzip-encoded HTTP response bodies.
///
/// Every service produced by one layer shares the layer's policy and its
/// buffer pool.
#[derive(Debug, Clone)]
pub struct UngzipLayer {
    policy: Arc<Policy>,
    pool: Arc<BufferPool<Vec<u8>>>,
}

impl UngzipLayer {
    /// Creates a new layer that matches every path and content type and
    /// decompresses bodies up to [`DEFAULT_MAX_SIZE`](crate::DEFAULT_MAX_SIZE).
    pub fn new() -> Self {
        Self::with_policy(Policy::default())
    }

    /// Creates a layer from declarative settings, validating them first.
    pub fn from_config(config: UngzipConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_policy(config.into_policy()?))
    }

    /// Creates a layer from an already validated policy.
    pub fn with_policy(policy: Policy) -> Self {
        Self {
            policy: Arc::new(policy),
            pool: Arc::new(BufferPool::new()),
        }
    }

    /// Only buffer responses to requests whose path starts with one of these.
    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Arc::make_mut(&mut self.policy).set_paths(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Only decompress responses whose `Content-Type` starts with one of these.
    pub fn content_types<I, P>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Arc::make_mut(&mut self.policy)
            .set_content_types(content_types.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the largest compressed body that will be decompressed.
    ///
    /// Only the compressed size is checked; the decoded body may be larger.
    /// Zero selects the default.
    pub fn max_size(mut self, size: usize) -> Self {
        let size = if size == 0 {
            crate::DEFAULT_MAX_SIZE
        } else {
            size
        };
        Arc::make_mut(&mut self.policy).set_max_size(size);
        self
    }

    /// Uses the given pool for response buffers instead of a private one.
    pub fn pool(mut self, pool: Arc<BufferPool<Vec<u8>>>) -> Self {
        self.pool = pool;
        self
    }

    /// Returns the policy applied by services built from this layer.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Returns the buffer pool shared by services built from this layer.
    pub fn buffer_pool(&self) -> Arc<BufferPool<Vec<u8>>> {
        Arc::clone(&self.pool)
    }
}

impl Default for UngzipLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for UngzipLayer {
    type Service = UngzipService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UngzipService::new(inner, Arc::clone(&self.policy), Arc::clone(&self.pool))
    }
}
