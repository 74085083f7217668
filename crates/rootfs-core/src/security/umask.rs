//! Scoped override of the process file-creation mask.
//!
//! The umask is process-wide. Every override taken through [`UmaskGuard`]
//! holds one global lock until the guard drops, so extractions running on
//! different threads take turns instead of clobbering each other's mask.

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use rustix::fs::Mode;

static UMASK_LOCK: Mutex<()> = Mutex::new(());

/// Exclusive override of the process umask, restored on drop.
///
/// # Examples
///
/// ```
/// use rootfs_core::security::UmaskGuard;
///
/// {
///     let _guard = UmaskGuard::unrestricted();
///     // files created here get exactly the mode they ask for
/// }
/// // previous mask is back
/// ```
#[derive(Debug)]
#[must_use = "the mask is restored as soon as the guard is dropped"]
pub struct UmaskGuard {
    previous: Mode,
    _lock: MutexGuard<'static, ()>,
}

impl UmaskGuard {
    /// Waits for any other override to end, then sets `mask`.
    pub fn acquire(mask: u32) -> Self {
        // The lock protects no data, so a poisoned lock is still usable.
        let lock = UMASK_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = rustix::process::umask(Mode::from_raw_mode(mask));
        Self {
            previous,
            _lock: lock,
        }
    }

    /// Sets the mask to `0` so creation modes are applied verbatim.
    pub fn unrestricted() -> Self {
        Self::acquire(0)
    }

    /// The mask that was in effect before this guard, restored on drop.
    #[must_use]
    pub fn previous(&self) -> u32 {
        self.previous.as_raw_mode()
    }
}

impl Drop for UmaskGuard {
    fn drop(&mut self) {
        rustix::process::umask(self.previous);
    }
}
