//! Hardware control and pool-side hash rate.

use std::future::Future;

use sunhash_domain::error::SunHashError;
use sunhash_domain::id::PerformanceTrackerId;
use sunhash_domain::miner::{HashRate, Miner, MinerReading};

use super::NotConfigured;

/// Drives a miner's hardware.
///
/// Commands are idempotent: turning on a running miner is a safe no-op.
pub trait MinerController: Send + Sync {
    fn turn_on(&self, miner: &Miner) -> impl Future<Output = Result<(), SunHashError>> + Send;

    fn turn_off(&self, miner: &Miner) -> impl Future<Output = Result<(), SunHashError>> + Send;

    /// What the hardware currently reports.
    fn get_status(
        &self,
        miner: &Miner,
    ) -> impl Future<Output = Result<MinerReading, SunHashError>> + Send;
}

impl<T: MinerController> MinerController for std::sync::Arc<T> {
    fn turn_on(&self, miner: &Miner) -> impl Future<Output = Result<(), SunHashError>> + Send {
        (**self).turn_on(miner)
    }

    fn turn_off(&self, miner: &Miner) -> impl Future<Output = Result<(), SunHashError>> + Send {
        (**self).turn_off(miner)
    }

    fn get_status(
        &self,
        miner: &Miner,
    ) -> impl Future<Output = Result<MinerReading, SunHashError>> + Send {
        (**self).get_status(miner)
    }
}

/// Hash rate as seen by a mining pool or monitoring service.
pub trait PerformanceTracker: Send + Sync {
    fn get_current_hashrate(
        &self,
        tracker: PerformanceTrackerId,
    ) -> impl Future<Output = Result<Option<HashRate>, SunHashError>> + Send;
}

impl PerformanceTracker for NotConfigured {
    async fn get_current_hashrate(
        &self,
        _tracker: PerformanceTrackerId,
    ) -> Result<Option<HashRate>, SunHashError> {
        Ok(None)
    }
}
