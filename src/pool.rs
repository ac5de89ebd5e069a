use std::collections::VecDeque;

use parking_lot::Mutex;

/// Sized recycling cache for objects that are expensive to create and cheap
/// to reset.
///
/// [`request`](ObjectPool::request) hands out a recycled instance when one
/// is available and manufactures a new one otherwise;
/// [`release`](ObjectPool::release) returns an instance for reuse, silently
/// dropping it once the pool is full. The pool never blocks.
///
/// # Examples
///
/// ```rust
/// use paceline::ObjectPool;
///
/// let pool = ObjectPool::new(|| Vec::<u8>::with_capacity(1024), 8);
///
/// let mut buf = pool.request();
/// buf.extend_from_slice(b"payload");
/// buf.clear();
/// pool.release(buf);
/// ```
pub struct ObjectPool<T> {
    factory: Box<dyn Fn() -> T + Send + Sync>,
    entries: Mutex<VecDeque<T>>,
    size_limit: usize,
}

impl<T> ObjectPool<T> {
    /// Pool retaining at most `size_limit` idle instances.
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static, size_limit: usize) -> Self {
        Self {
            factory: Box::new(factory),
            entries: Mutex::new(VecDeque::new()),
            size_limit,
        }
    }

    /// Pool without a retention bound.
    pub fn unbounded(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::new(factory, usize::MAX)
    }

    /// Take a recycled instance, or manufacture a new one when the pool is
    /// empty.
    pub fn request(&self) -> T {
        let recycled = self.entries.lock().pop_front();
        recycled.unwrap_or_else(|| (self.factory)())
    }

    /// Return an instance for reuse. Dropped when the pool already holds
    /// `size_limit` idle instances.
    pub fn release(&self, entry: T) {
        let mut entries = self.entries.lock();
        if entries.len() < self.size_limit {
            entries.push_back(entry);
        }
    }
}
