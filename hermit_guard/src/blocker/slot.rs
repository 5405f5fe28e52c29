use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Process-wide slot holding the decision state a blocker installs while
/// active.
///
/// This is the Rust rendering of entry-point interposition: the slot is the
/// swapped handle. Guarded entry points read it on every call; an empty slot
/// means "not interposed" and the call is allowed through untouched. Only the
/// owning blocker writes the slot, and strict non-overlap of enforcement
/// windows (one Armed test per worker) keeps install/clear races out of the
/// model.
pub(crate) struct HookSlot<T> {
    inner: RwLock<Option<Arc<T>>>,
}

impl<T> HookSlot<T> {
    pub(crate) const fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    pub(crate) fn install(&self, hook: Arc<T>) {
        *self.write() = Some(hook);
    }

    /// Remove the hook. Idempotent: clearing an empty slot is a no-op.
    pub(crate) fn clear(&self) {
        *self.write() = None;
    }

    pub(crate) fn snapshot(&self) -> Option<Arc<T>> {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<T>>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<T>>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
