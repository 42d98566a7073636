//! Cooperative shutdown on SIGINT/SIGTERM.
//!
//! The process-wide signal handler can only be installed once, so it
//! flips a shared flag owned by a `OnceLock`; each run constructs a
//! [`Coordinator`] that resets the flag and hands it to workers, which
//! check it between tiles and unwind with `Error::Cancelled`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use log::warn;

use crate::error::{Error, Result};

static CANCEL_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

pub struct Coordinator {
    flag: Arc<AtomicBool>,
}

impl Coordinator {
    /// Install the signal handler (first call only) and start a fresh
    /// run with a cleared flag.
    pub fn install() -> Self {
        let flag = CANCEL_FLAG
            .get_or_init(|| {
                let flag = Arc::new(AtomicBool::new(false));
                let handler_flag = Arc::clone(&flag);
                if let Err(e) = ctrlc::set_handler(move || {
                    handler_flag.store(true, Ordering::SeqCst);
                }) {
                    warn!("could not install signal handler: {e}");
                }
                flag
            })
            .clone();
        flag.store(false, Ordering::SeqCst);
        Self { flag }
    }

    #[inline]
    pub fn cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Error out if a shutdown was requested.
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Request shutdown programmatically (used by tests in place of a
    /// real signal).
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::Coordinator;
    use crate::error::Error;

    #[test]
    fn checkpoint_reports_cancellation() {
        let coordinator = Coordinator::install();
        assert!(coordinator.checkpoint().is_ok());
        coordinator.cancel();
        assert!(coordinator.cancelled());
        assert!(matches!(coordinator.checkpoint(), Err(Error::Cancelled)));
        // A later run starts clean.
        let next = Coordinator::install();
        assert!(!next.cancelled());
    }
}
