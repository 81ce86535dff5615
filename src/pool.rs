//! A small concurrency-safe object pool for response buffers.

use bytes::BytesMut;
use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Default number of idle values a pool keeps around.
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Default largest capacity (in bytes) a buffer may have and still be retained.
pub const DEFAULT_MAX_RETAINED_CAPACITY: usize = 1024 * 1024;

/// Values that can be cleared and handed out again.
pub trait Recycle: Default {
    /// Clears the value so no data from a previous checkout is visible.
    fn reset(&mut self);

    /// Bytes of backing storage currently held.
    fn capacity(&self) -> usize;
}

impl Recycle for Vec<u8> {
    fn reset(&mut self) {
        self.clear();
    }

    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }
}

impl Recycle for BytesMut {
    fn reset(&mut self) {
        self.clear();
    }

    fn capacity(&self) -> usize {
        BytesMut::capacity(self)
    }
}

/// A checkout/return pool of reusable values.
///
/// [`get`](BufferPool::get) never waits: it reuses an idle value when one is
/// available and allocates a fresh one otherwise. The value goes back to the
/// pool when the returned [`Pooled`] guard is dropped.
pub struct BufferPool<T> {
    idle: Mutex<Vec<T>>,
    max_idle: usize,
    max_retained_capacity: usize,
}

impl<T: Recycle> BufferPool<T> {
    /// Creates a pool with the default limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_IDLE, DEFAULT_MAX_RETAINED_CAPACITY)
    }

    /// Creates a pool that keeps at most `max_idle` values and drops any value
    /// whose capacity grew beyond `max_retained_capacity`.
    pub fn with_limits(max_idle: usize, max_retained_capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            max_retained_capacity,
        }
    }

    /// Checks a reset value out of the pool.
    pub fn get(self: &Arc<Self>) -> Pooled<T> {
        let mut value = self.idle.lock().pop().unwrap_or_default();
        value.reset();
        Pooled {
            value,
            pool: Arc::clone(self),
        }
    }

    /// Number of idle values currently held.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    fn put(&self, value: T) {
        if value.capacity() > self.max_retained_capacity {
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(value);
        }
    }
}

impl<T: Recycle> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BufferPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle.lock().len())
            .field("max_idle", &self.max_idle)
            .field("max_retained_capacity", &self.max_retained_capacity)
            .finish()
    }
}

/// A value checked out of a [`BufferPool`]; returned to the pool on drop.
pub struct Pooled<T: Recycle> {
    value: T,
    pool: Arc<BufferPool<T>>,
}

impl<T: Recycle> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Recycle> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Recycle> Drop for Pooled<T> {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.value));
    }
}

impl<T: Recycle + fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pooled").field(&self.value).finish()
    }
}
