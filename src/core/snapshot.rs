use std::fmt;
use std::ops::{Deref, Range};
use std::sync::{Arc, RwLock};

/// Read-only view of a series at the moment it was taken.
///
/// Range queries share the underlying buffer rather than copying it; later
/// mutations publish a new buffer and never touch this one.
#[derive(Clone)]
pub struct Snapshot<R> {
    buffer: Arc<[R]>,
    range: Range<usize>,
}

impl<R> Snapshot<R> {
    pub(crate) fn new(buffer: Arc<[R]>, range: Range<usize>) -> Self {
        debug_assert!(range.start <= range.end && range.end <= buffer.len());
        Self { buffer, range }
    }

    pub(crate) fn whole(buffer: Arc<[R]>) -> Self {
        let len = buffer.len();
        Self::new(buffer, 0..len)
    }

    pub fn as_slice(&self) -> &[R] {
        &self.buffer[self.range.clone()]
    }
}

impl<R> Deref for Snapshot<R> {
    type Target = [R];

    fn deref(&self) -> &[R] {
        self.as_slice()
    }
}

impl<R> AsRef<[R]> for Snapshot<R> {
    fn as_ref(&self) -> &[R] {
        self.as_slice()
    }
}

impl<'a, R> IntoIterator for &'a Snapshot<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<R: PartialEq> PartialEq for Snapshot<R> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<R: Eq> Eq for Snapshot<R> {}

impl<R: fmt::Debug> fmt::Debug for Snapshot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// The published buffer. Only the series worker calls `publish`; readers hold
/// the lock just long enough to clone the `Arc`.
pub(crate) struct SharedBuffer<R> {
    current: RwLock<Arc<[R]>>,
}

impl<R> SharedBuffer<R> {
    pub(crate) fn new(initial: Vec<R>) -> Self {
        Self {
            current: RwLock::new(Arc::from(initial)),
        }
    }

    pub(crate) fn load(&self) -> Arc<[R]> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub(crate) fn publish(&self, next: Arc<[R]>) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = next;
    }
}
