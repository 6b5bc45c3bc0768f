//! Cooperative cancellation and signal routing.
//!
//! Signals never exit the process directly. They set a shared flag that the
//! controller polls before every frame read and at stage boundaries, so the
//! run still stops its collaborators and removes temporary files.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle for cancelling a running capture.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// The frame loop stops before its next read.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Route SIGINT, SIGTERM and SIGQUIT into `handle`.
///
/// Repeated signals only set the flag again; the run always reaches cleanup.
#[cfg(unix)]
pub fn install_signal_handlers(handle: &CancelHandle) -> io::Result<()> {
    use signal_hook::consts::TERM_SIGNALS;
    use signal_hook::flag;

    for &signal in TERM_SIGNALS {
        flag::register(signal, Arc::clone(&handle.flag))?;
    }
    tracing::debug!("Installed handlers for {} signals", TERM_SIGNALS.len());
    Ok(())
}

/// Install signal handlers (no-op on non-Unix platforms).
#[cfg(not(unix))]
pub fn install_signal_handlers(_handle: &CancelHandle) -> io::Result<()> {
    Ok(())
}
