//! Per-miner exclusion so that two cycles never command the same miner at once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use sunhash_domain::id::MinerId;

/// Set of miners with a decision in progress.
///
/// Cloning shares the set, so every service handed a clone excludes the others.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    miners: Arc<Mutex<HashSet<MinerId>>>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `miner`, or `None` if another task holds it.
    ///
    /// The claim is released when the guard is dropped, including when the
    /// owning future is cancelled.
    #[must_use]
    pub fn try_acquire(&self, miner: MinerId) -> Option<InFlightGuard> {
        let mut miners = self.miners.lock().unwrap_or_else(PoisonError::into_inner);
        miners.insert(miner).then(|| InFlightGuard {
            miners: Arc::clone(&self.miners),
            miner,
        })
    }

    #[must_use]
    pub fn contains(&self, miner: MinerId) -> bool {
        self.miners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&miner)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    miners: Arc<Mutex<HashSet<MinerId>>>,
    miner: MinerId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.miners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.miner);
    }
}
