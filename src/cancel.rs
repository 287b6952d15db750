//! Cooperative cancellation for a run
//!
//! A [`CancellationToken`] is shared between the Ctrl-C handler and the
//! updater. The updater checks it before each host call, so an interrupted
//! run stops at the next call boundary instead of in the middle of one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::warn;

use crate::error::{Error, Result};

/// Cloneable cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Error::Cancelled` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Cancel this token on Ctrl-C.
    ///
    /// Only one handler can be installed per process.
    pub fn install_signal_handler(&self) -> std::result::Result<(), ctrlc::Error> {
        let token = self.clone();
        ctrlc::set_handler(move || {
            warn!("Interrupt received, stopping after the current host call");
            token.cancel();
        })
    }
}
