use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

static LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Serialize tests that install process-wide hook slots.
///
/// Enforcement windows must not overlap within one worker process, and the
/// test binary's threads count as one worker here.
pub fn serial() -> MutexGuard<'static, ()> {
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}
