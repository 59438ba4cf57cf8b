//! Repository traits for persistence.
//!
//! Every aggregate is addressed by its id. `save_*` creates or replaces.

use std::future::Future;

use sunhash_domain::energy::EnergySource;
use sunhash_domain::error::SunHashError;
use sunhash_domain::id::{EnergySourceId, MinerId, OptimizationUnitId, PolicyId};
use sunhash_domain::miner::Miner;
use sunhash_domain::optimization_unit::OptimizationUnit;
use sunhash_domain::policy::OptimizationPolicy;

/// Repository for persisting and querying [`Miner`]s.
pub trait MinerRepository: Send + Sync {
    fn get_miner(
        &self,
        id: MinerId,
    ) -> impl Future<Output = Result<Option<Miner>, SunHashError>> + Send;

    fn list_miners(&self) -> impl Future<Output = Result<Vec<Miner>, SunHashError>> + Send;

    fn save_miner(&self, miner: Miner)
    -> impl Future<Output = Result<Miner, SunHashError>> + Send;

    fn delete_miner(&self, id: MinerId) -> impl Future<Output = Result<(), SunHashError>> + Send;

    /// Persist the operational state of `miner` (status, hash rate, power
    /// draw) onto the stored record, keeping every other field as stored.
    ///
    /// Used after a controller round-trip, when the copy in hand may be
    /// older than an operator edit. A miner deleted in the meantime is not
    /// recreated.
    fn save_miner_status(
        &self,
        miner: Miner,
    ) -> impl Future<Output = Result<Miner, SunHashError>> + Send {
        async move {
            match self.get_miner(miner.id).await? {
                Some(mut stored) => {
                    stored.adopt_operational_state(&miner);
                    self.save_miner(stored).await
                }
                None => Ok(miner),
            }
        }
    }
}

/// Repository for persisting and querying [`OptimizationPolicy`]s.
pub trait PolicyRepository: Send + Sync {
    fn get_policy(
        &self,
        id: PolicyId,
    ) -> impl Future<Output = Result<Option<OptimizationPolicy>, SunHashError>> + Send;

    fn list_policies(
        &self,
    ) -> impl Future<Output = Result<Vec<OptimizationPolicy>, SunHashError>> + Send;

    fn save_policy(
        &self,
        policy: OptimizationPolicy,
    ) -> impl Future<Output = Result<OptimizationPolicy, SunHashError>> + Send;

    fn delete_policy(&self, id: PolicyId)
    -> impl Future<Output = Result<(), SunHashError>> + Send;
}

/// Repository for persisting and querying [`EnergySource`]s.
pub trait EnergySourceRepository: Send + Sync {
    fn get_energy_source(
        &self,
        id: EnergySourceId,
    ) -> impl Future<Output = Result<Option<EnergySource>, SunHashError>> + Send;

    fn list_energy_sources(
        &self,
    ) -> impl Future<Output = Result<Vec<EnergySource>, SunHashError>> + Send;

    fn save_energy_source(
        &self,
        source: EnergySource,
    ) -> impl Future<Output = Result<EnergySource, SunHashError>> + Send;

    fn delete_energy_source(
        &self,
        id: EnergySourceId,
    ) -> impl Future<Output = Result<(), SunHashError>> + Send;
}

/// Repository for persisting and querying [`OptimizationUnit`]s.
pub trait OptimizationUnitRepository: Send + Sync {
    fn get_unit(
        &self,
        id: OptimizationUnitId,
    ) -> impl Future<Output = Result<Option<OptimizationUnit>, SunHashError>> + Send;

    fn list_units(
        &self,
    ) -> impl Future<Output = Result<Vec<OptimizationUnit>, SunHashError>> + Send;

    fn save_unit(
        &self,
        unit: OptimizationUnit,
    ) -> impl Future<Output = Result<OptimizationUnit, SunHashError>> + Send;

    fn delete_unit(
        &self,
        id: OptimizationUnitId,
    ) -> impl Future<Output = Result<(), SunHashError>> + Send;
}

/// Every repository the services need, usually backed by one store.
pub trait Repositories:
    MinerRepository + PolicyRepository + EnergySourceRepository + OptimizationUnitRepository
{
}

impl<T> Repositories for T where
    T: MinerRepository + PolicyRepository + EnergySourceRepository + OptimizationUnitRepository
{
}
