//! Ctrl+C handling.
//!
//! The first Ctrl+C sets a shared flag. Hashing checks it between buffer
//! reads and the collision analysis between files; both stop early and the
//! command exits with code 130. Nothing is deleted or written after the
//! flag is set.
//!
//! ```rust,no_run
//! use rustsums::hashing::Hasher;
//!
//! let shutdown = rustsums::signal::install_handler();
//! let hasher = Hasher::new().with_shutdown_flag(shutdown.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Cancellation flag shared between the signal hook and the workers.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// A handler that is not hooked to any signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed (or [`ShutdownHandler::request_shutdown`] called).
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the flag as if Ctrl+C had been pressed.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The flag itself, for [`crate::hashing::Hasher`] and
    /// [`crate::collisions::FinderConfig`].
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub(crate) fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

static INSTALLED: OnceLock<ShutdownHandler> = OnceLock::new();

fn hook(handler: &ShutdownHandler) -> Result<(), ctrlc::Error> {
    let flag = handler.get_flag();
    ctrlc::set_handler(move || {
        if !flag.swap(true, Ordering::SeqCst) {
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\nInterrupted. Finishing current file...");
            let _ = stderr.flush();
        }
    })
}

/// Hook Ctrl+C on first use and return the process-wide handler.
///
/// Every call returns the same flag, cleared, so commands run one after
/// another in the same process start from a clean state. When the hook
/// cannot be installed (another library owns it), the handler still works
/// through [`ShutdownHandler::request_shutdown`].
pub fn install_handler() -> ShutdownHandler {
    let handler = INSTALLED.get_or_init(|| {
        let handler = ShutdownHandler::new();
        match hook(&handler) {
            Ok(()) => log::debug!("Ctrl+C handler installed"),
            Err(e) => log::warn!("Ctrl+C will not stop the run cleanly: {}", e),
        }
        handler
    });
    handler.reset();
    handler.clone()
}
