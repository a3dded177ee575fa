//! Cooperative interruption
//!
//! Termination signals never unwind the pipeline directly. The handler only
//! records the signal number. The runner polls it while a subprocess runs
//! and stops the child once it is set; the builder looks at it between
//! stages and after the output is written. The normal error path performs
//! the cleanup.

use crate::error::{BuildError, BuildResult};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared cancellation flag holding the first raised signal number
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicI32>,
}

/// Flag that OS signal handlers report into
static DELIVERY: OnceLock<Interrupt> = OnceLock::new();

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; only the first request is kept
    pub fn raise(&self, signal: i32) {
        let _ = self
            .raised
            .compare_exchange(0, signal, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Signal number of a pending request
    pub fn raised(&self) -> Option<i32> {
        match self.raised.load(Ordering::SeqCst) {
            0 => None,
            signal => Some(signal),
        }
    }

    /// Fail with [`BuildError::Interrupted`] if cancellation was requested
    pub fn check(&self) -> BuildResult<()> {
        match self.raised() {
            Some(signal) => Err(BuildError::Interrupted { signal }),
            None => Ok(()),
        }
    }
}

/// Route SIGINT, SIGTERM and SIGHUP into `interrupt`.
///
/// Returns `false` if handlers were already installed for another flag.
#[cfg(unix)]
pub fn install_signal_handlers(interrupt: &Interrupt) -> bool {
    if DELIVERY.set(interrupt.clone()).is_err() {
        return false;
    }

    for signal in [libc::SIGINT, libc::SIGTERM, libc::SIGHUP] {
        // SAFETY: the handler only performs atomic operations
        unsafe {
            libc::signal(signal, on_signal as libc::sighandler_t);
        }
    }
    true
}

#[cfg(not(unix))]
pub fn install_signal_handlers(interrupt: &Interrupt) -> bool {
    DELIVERY.set(interrupt.clone()).is_ok()
}

#[cfg(unix)]
extern "C" fn on_signal(signal: libc::c_int) {
    if let Some(interrupt) = DELIVERY.get() {
        interrupt.raise(signal);
    }
}
