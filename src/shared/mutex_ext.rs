//! Usage: Mutex extension trait that recovers from poisoned locks.

use std::sync::{Mutex, MutexGuard};

/// Extends `Mutex` with an accessor that recovers a poisoned lock instead of
/// propagating the panic to the caller.
pub(crate) trait MutexExt<T> {
    /// Acquires the lock; on poison, recovers the inner value and logs.
    fn lock_or_recover(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    #[track_caller]
    fn lock_or_recover(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    mutex_type = std::any::type_name::<T>(),
                    file = loc.file(),
                    line = loc.line(),
                    "mutex poisoned by a panicking thread; recovering the value"
                );
                poisoned.into_inner()
            }
        }
    }
}
