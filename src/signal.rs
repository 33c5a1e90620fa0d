//! Cancellation token and Ctrl+C wiring.
//!
//! A [`CancelToken`] wraps a shared `AtomicBool`. The walker, the hashing
//! pool and the action executor check it between files, so a long scan can
//! be stopped without leaving a half-written report behind.
//!
//! ```rust,no_run
//! use filesift::signal::install_handler;
//!
//! let token = install_handler().expect("Failed to install signal handler");
//! // hand token.flag() to the orchestrator
//! if token.is_cancelled() {
//!     return;
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption (128 + SIGINT).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared cancellation flag.
///
/// Cloning a token shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The raw flag, for components configured with `with_shutdown_flag`.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Install a Ctrl+C handler that cancels the returned token.
///
/// The process-wide hook can only be registered once; later calls (for
/// example from tests driving `run_app` repeatedly) get the same token back
/// with its flag reset.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] only when `ctrlc` refuses the hook
/// and no token was registered earlier in this process.
pub fn install_handler() -> Result<CancelToken, SignalError> {
    if let Some(token) = GLOBAL_TOKEN.get() {
        token.reset();
        return Ok(token.clone());
    }

    let token = CancelToken::new();
    let flag = token.flag();

    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing current file...");
        let _ = std::io::stderr().flush();
        log::info!("Cancellation requested by signal");
    }) {
        Ok(()) => {
            let _ = GLOBAL_TOKEN.set(token.clone());
            Ok(token)
        }
        Err(ctrlc::Error::MultipleHandlers) => {
            log::debug!("Ctrl+C handler already registered, using unhooked token");
            let fallback = GLOBAL_TOKEN.get_or_init(CancelToken::new);
            fallback.reset();
            Ok(fallback.clone())
        }
        Err(e) => Err(SignalError::InstallFailed(e)),
    }
}
