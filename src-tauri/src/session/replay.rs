//! Replay suppression with a settle barrier.
//!
//! Undo and redo drive the draft back through the processor using the same
//! round trip as a commit. While that happens the guard is set and
//! history pushes are suppressed. The guard is held by a [`ReplayPermit`]
//! and is only cleared when the permit is released, after the round
//! trip it covers has resolved. A fallback timeout bounds how long a hung
//! call can hold it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::RetouchError;

#[derive(Debug, Clone, Default)]
pub struct ReplayGuard {
    replaying: Arc<AtomicBool>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying.load(Ordering::Acquire)
    }

    /// Mark a replay as running. Returns `None` if one already is.
    pub fn try_enter(&self) -> Option<ReplayPermit> {
        self.replaying
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| {
                debug!("Replay guard engaged");
                ReplayPermit {
                    replaying: Arc::clone(&self.replaying),
                    entered_at: Instant::now(),
                }
            })
    }
}

/// Proof that a replay is running. Dropping it clears the guard,
/// so an abandoned replay cannot leave pushes suppressed forever.
#[derive(Debug)]
pub struct ReplayPermit {
    replaying: Arc<AtomicBool>,
    entered_at: Instant,
}

impl ReplayPermit {
    /// Wait for the round trip this permit covers, giving up after
    /// `fallback`. The permit stays held; call [`release`](Self::release)
    /// once the outcome has been applied.
    pub async fn await_settled<F, T>(&self, fallback: Duration, round_trip: F) -> Result<T, RetouchError>
    where
        F: Future<Output = Result<T, RetouchError>>,
    {
        match tokio::time::timeout(fallback, round_trip).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Replay round trip still pending after {:?}, abandoning it",
                    fallback
                );
                Err(RetouchError::Timeout(fallback))
            }
        }
    }

    pub fn release(self) {
        // Drop does the work
    }
}

impl Drop for ReplayPermit {
    fn drop(&mut self) {
        self.replaying.store(false, Ordering::Release);
        debug!("Replay guard released after {:?}", self.entered_at.elapsed());
    }
}
