//! Batch cancellation
//!
//! SIGINT and SIGTERM set a process-wide flag. Provers run in their own
//! process groups, so a terminal Ctrl-C never reaches them directly; the
//! runner sees the flag on its next poll tick and hardkills the attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag set by the signal handler
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Check if a graceful shutdown has been requested via SIGINT/SIGTERM.
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

/// Install SIGINT and SIGTERM handlers that set the shutdown flag.
/// The handler is async-signal-safe (only sets an atomic).
#[cfg(unix)]
pub fn install_signal_handlers() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = shutdown_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        for signal in [libc::SIGINT, libc::SIGTERM] {
            if libc::sigaction(signal, &sa, std::ptr::null_mut()) != 0 {
                tracing::warn!(signal, "failed to install shutdown handler");
            }
        }
    }
}

#[cfg(unix)]
extern "C" fn shutdown_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

/// No-op on non-Unix.
#[cfg(not(unix))]
pub fn install_signal_handlers() {}

/// Cancellation shared by every worker of one batch.
///
/// Tripped explicitly on a fatal error, and implicitly by a shutdown signal.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the batch: no new attempts start, running ones are killed
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed) || shutdown_requested()
    }

    /// Whether the cancellation came from a signal rather than [`cancel`](Self::cancel)
    pub fn by_signal(&self) -> bool {
        shutdown_requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let worker = token.clone();
        assert!(!worker.is_cancelled());
        token.cancel();
        assert!(worker.is_cancelled());
    }
}
