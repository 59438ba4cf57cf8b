//! Simulated miner hardware.
//!
//! A command puts the rig in `Starting` or `Stopping`; the hardware settles
//! after a configurable number of status polls, the way a real ASIC takes a
//! while to boot or spin down.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use sunhash_app::ports::{MinerController, PerformanceTracker};
use sunhash_domain::error::SunHashError;
use sunhash_domain::id::{MinerId, PerformanceTrackerId};
use sunhash_domain::miner::{HashRate, Miner, MinerReading, MinerStatus};
use sunhash_domain::units::Watts;

use crate::error::VirtualError;

#[derive(Debug, Clone, Copy)]
struct Rig {
    status: MinerStatus,
    polls_left: u32,
    unreachable: bool,
    hash_rate: Option<HashRate>,
    power: Option<Watts>,
}

impl Rig {
    /// Hardware found in the state the miner was last known in.
    fn discovered(miner: &Miner, polls: u32) -> Self {
        let status = match miner.status {
            MinerStatus::Unknown => MinerStatus::Off,
            other => other,
        };
        Self {
            status,
            polls_left: polls,
            unreachable: false,
            hash_rate: miner.hash_rate_max,
            power: miner.power_consumption_max,
        }
    }

    fn reading(&self) -> MinerReading {
        let running = self.status == MinerStatus::On;
        MinerReading {
            status: self.status,
            hash_rate: if running { self.hash_rate } else { None },
            power: if running { self.power } else { None },
        }
    }
}

/// Controller for simulated rigs. Clones share the same hardware.
#[derive(Debug, Clone)]
pub struct VirtualMinerController {
    rigs: Arc<Mutex<HashMap<MinerId, Rig>>>,
    confirmation_polls: u32,
}

impl Default for VirtualMinerController {
    fn default() -> Self {
        Self {
            rigs: Arc::default(),
            confirmation_polls: 1,
        }
    }
}

impl VirtualMinerController {
    /// Number of `get_status` calls before a start or stop settles; zero settles immediately.
    #[must_use]
    pub fn with_confirmation_polls(mut self, polls: u32) -> Self {
        self.confirmation_polls = polls;
        self
    }

    /// Make a rig stop answering commands and status reads.
    pub fn set_unreachable(&self, miner: &Miner, unreachable: bool) {
        self.with_rig(miner, |rig| rig.unreachable = unreachable);
    }

    /// Simulate a hardware fault.
    pub fn break_down(&self, miner: &Miner) {
        self.with_rig(miner, |rig| rig.status = MinerStatus::Error);
    }

    /// Current hardware status, `None` for a rig never seen.
    #[must_use]
    pub fn status_of(&self, id: MinerId) -> Option<MinerStatus> {
        self.lock().get(&id).map(|rig| rig.status)
    }

    /// Total hash rate of running rigs in TH/s, `None` when nothing runs.
    #[must_use]
    pub fn running_hash_rate(&self) -> Option<HashRate> {
        let rigs = self.lock();
        let running: Vec<f64> = rigs
            .values()
            .filter(|rig| rig.status == MinerStatus::On)
            .filter_map(|rig| rig.hash_rate)
            .map(|rate| rate.as_terahashes())
            .collect();
        (!running.is_empty()).then(|| HashRate::terahashes(running.iter().sum()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MinerId, Rig>> {
        self.rigs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_rig<T>(&self, miner: &Miner, f: impl FnOnce(&mut Rig) -> T) -> T {
        let mut rigs = self.lock();
        let rig = rigs
            .entry(miner.id)
            .or_insert_with(|| Rig::discovered(miner, self.confirmation_polls));
        f(rig)
    }

    fn command(&self, miner: &Miner, pending: MinerStatus) -> Result<(), VirtualError> {
        let settled = settled(pending);
        let polls = self.confirmation_polls;
        self.with_rig(miner, |rig| {
            if rig.unreachable {
                return Err(VirtualError::Unreachable(miner.id));
            }
            if rig.status == pending || rig.status == settled {
                return Ok(());
            }
            rig.hash_rate = miner.hash_rate_max;
            rig.power = miner.power_consumption_max;
            if polls == 0 {
                rig.status = settled;
            } else {
                rig.status = pending;
                rig.polls_left = polls;
            }
            Ok(())
        })
    }
}

fn settled(status: MinerStatus) -> MinerStatus {
    match status {
        MinerStatus::Starting => MinerStatus::On,
        MinerStatus::Stopping => MinerStatus::Off,
        other => other,
    }
}

impl MinerController for VirtualMinerController {
    async fn turn_on(&self, miner: &Miner) -> Result<(), SunHashError> {
        self.command(miner, MinerStatus::Starting)?;
        tracing::info!(miner = %miner.name, "virtual miner starting");
        Ok(())
    }

    async fn turn_off(&self, miner: &Miner) -> Result<(), SunHashError> {
        self.command(miner, MinerStatus::Stopping)?;
        tracing::info!(miner = %miner.name, "virtual miner stopping");
        Ok(())
    }

    async fn get_status(&self, miner: &Miner) -> Result<MinerReading, SunHashError> {
        let reading = self.with_rig(miner, |rig| {
            if rig.unreachable {
                return Err(VirtualError::Unreachable(miner.id));
            }
            if rig.status.is_transitional() {
                rig.polls_left = rig.polls_left.saturating_sub(1);
                if rig.polls_left == 0 {
                    rig.status = settled(rig.status);
                }
            }
            Ok(rig.reading())
        })?;
        Ok(reading)
    }
}

/// Reports the combined hash rate of a [`VirtualMinerController`]'s running rigs.
#[derive(Debug, Clone)]
pub struct VirtualPerformanceTracker {
    controller: VirtualMinerController,
}

impl VirtualPerformanceTracker {
    #[must_use]
    pub fn new(controller: VirtualMinerController) -> Self {
        Self { controller }
    }
}

impl PerformanceTracker for VirtualPerformanceTracker {
    async fn get_current_hashrate(
        &self,
        _tracker: PerformanceTrackerId,
    ) -> Result<Option<HashRate>, SunHashError> {
        Ok(self.controller.running_hash_rate())
    }
}
