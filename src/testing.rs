//! Test support utilities
//!
//! Fault-injecting wrappers used by this crate's own tests and available to
//! downstream crates testing their cache integration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::store::KeyValueStore;

/// Store wrapper that fails reads and/or writes on demand
///
/// Used to exercise the degradation path: flip `fail_reads` / `fail_writes`
/// mid-test and every affected operation returns
/// [`StoreError::Unavailable`]. Clones share the failure flags.
#[derive(Debug)]
pub struct FailingStore<S> {
    inner: S,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl<S: Clone> Clone for FailingStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            fail_reads: Arc::clone(&self.fail_reads),
            fail_writes: Arc::clone(&self.fail_writes),
        }
    }
}

impl<S> FailingStore<S> {
    /// Wrap a store; all operations pass through until a flag is flipped
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make subsequent reads fail (or succeed again)
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every operation fail (or succeed again)
    pub fn fail_all(&self, fail: bool) {
        self.fail_reads(fail);
        self.fail_writes(fail);
    }

    fn injected() -> StoreError {
        StoreError::Unavailable("injected failure".to_string())
    }
}

impl<S: KeyValueStore> KeyValueStore for FailingStore<S> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.remove(key)
    }

    fn clear(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.clear()
    }
}
