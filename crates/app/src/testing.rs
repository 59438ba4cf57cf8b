//! In-memory fakes shared by the service tests.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{TimeDelta, TimeZone, Utc};
use sunhash_domain::energy::{EnergySource, EnergyStateSnapshot, LoadState};
use sunhash_domain::error::{DataUnavailableError, SunHashError};
use sunhash_domain::forecast::{Forecast, ForecastInterval, ForecastPowerPoint};
use sunhash_domain::id::{
    EnergySourceId, MinerId, NotifierId, OptimizationUnitId, PerformanceTrackerId, PolicyId,
};
use sunhash_domain::miner::{HashRate, Miner, MinerCommand, MinerReading, MinerStatus};
use sunhash_domain::notification::Notification;
use sunhash_domain::optimization_unit::OptimizationUnit;
use sunhash_domain::policy::{
    AutomationRule, Clause, Metric, Operand, OptimizationPolicy, Operator, RuleSet,
};
use sunhash_domain::time::Timestamp;
use sunhash_domain::units::Watts;

use crate::ports::{
    EnergyMonitor, EnergySourceRepository, ForecastProvider, MinerController, MinerRepository,
    Notifier, OptimizationUnitRepository, PerformanceTracker, PolicyRepository,
};
use crate::services::context_assembler::{CycleInputSource, CycleInputs};

pub fn ts(hour: u32, minute: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
}

pub fn snapshot(production: f64) -> EnergyStateSnapshot {
    EnergyStateSnapshot {
        production: Watts(production),
        consumption: LoadState {
            current_power: Watts(400.0),
            timestamp: ts(12, 0),
        },
        battery: None,
        grid: None,
        external_source: None,
        timestamp: ts(12, 0),
    }
}

fn production(operator: Operator, watts: f64) -> Clause {
    Clause::Threshold {
        field: Metric::Production,
        operator,
        value: Operand::Value(watts),
    }
}

/// Start above 2 kW, stop below 1 kW, both at priority 100.
pub fn scenario_policy() -> OptimizationPolicy {
    let mut policy = OptimizationPolicy::new("Solar surplus").unwrap();
    policy
        .add_rule(
            RuleSet::Start,
            AutomationRule::builder()
                .name("sunny")
                .priority(100)
                .clause(production(Operator::Gt, 2000.0))
                .build()
                .unwrap(),
        )
        .unwrap();
    policy
        .add_rule(
            RuleSet::Stop,
            AutomationRule::builder()
                .name("cloudy")
                .priority(100)
                .clause(production(Operator::Lt, 1000.0))
                .build()
                .unwrap(),
        )
        .unwrap();
    policy
}

#[derive(Default)]
struct Tables {
    miners: HashMap<MinerId, Miner>,
    policies: HashMap<PolicyId, OptimizationPolicy>,
    sources: HashMap<EnergySourceId, EnergySource>,
    units: HashMap<OptimizationUnitId, OptimizationUnit>,
    /// Applied after the next unit read.
    queued_unit: Option<OptimizationUnit>,
    /// Applied after the next miner read.
    queued_miner: Option<Miner>,
    failing_miner_saves: HashSet<MinerId>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn insert_miner(&self, miner: Miner) {
        self.tables.lock().unwrap().miners.insert(miner.id, miner);
    }

    pub fn insert_policy(&self, policy: OptimizationPolicy) {
        self.tables.lock().unwrap().policies.insert(policy.id, policy);
    }

    pub fn insert_energy_source(&self, source: EnergySource) {
        self.tables.lock().unwrap().sources.insert(source.id, source);
    }

    pub fn insert_unit(&self, unit: OptimizationUnit) {
        self.tables.lock().unwrap().units.insert(unit.id, unit);
    }

    /// Replace a unit right after it is next read.
    pub fn queue_unit_update(&self, unit: OptimizationUnit) {
        self.tables.lock().unwrap().queued_unit = Some(unit);
    }

    /// Replace a miner right after it is next read.
    pub fn queue_miner_update(&self, miner: Miner) {
        self.tables.lock().unwrap().queued_miner = Some(miner);
    }

    /// Make every save of `id` fail.
    pub fn fail_miner_saves(&self, id: MinerId) {
        self.tables.lock().unwrap().failing_miner_saves.insert(id);
    }

    pub fn miner(&self, id: MinerId) -> Option<Miner> {
        self.tables.lock().unwrap().miners.get(&id).cloned()
    }

    pub fn policies(&self) -> Vec<OptimizationPolicy> {
        self.tables.lock().unwrap().policies.values().cloned().collect()
    }
}

impl MinerRepository for InMemoryStore {
    fn get_miner(
        &self,
        id: MinerId,
    ) -> impl Future<Output = Result<Option<Miner>, SunHashError>> + Send {
        let mut tables = self.tables.lock().unwrap();
        let result = tables.miners.get(&id).cloned();
        if let Some(queued) = tables.queued_miner.take() {
            tables.miners.insert(queued.id, queued);
        }
        async { Ok(result) }
    }

    fn list_miners(&self) -> impl Future<Output = Result<Vec<Miner>, SunHashError>> + Send {
        let result: Vec<Miner> = self.tables.lock().unwrap().miners.values().cloned().collect();
        async { Ok(result) }
    }

    fn save_miner(
        &self,
        miner: Miner,
    ) -> impl Future<Output = Result<Miner, SunHashError>> + Send {
        let mut tables = self.tables.lock().unwrap();
        let result = if tables.failing_miner_saves.contains(&miner.id) {
            Err(SunHashError::Storage("disk full".into()))
        } else {
            tables.miners.insert(miner.id, miner.clone());
            Ok(miner)
        };
        async { result }
    }

    fn delete_miner(&self, id: MinerId) -> impl Future<Output = Result<(), SunHashError>> + Send {
        self.tables.lock().unwrap().miners.remove(&id);
        async { Ok(()) }
    }
}

impl PolicyRepository for InMemoryStore {
    fn get_policy(
        &self,
        id: PolicyId,
    ) -> impl Future<Output = Result<Option<OptimizationPolicy>, SunHashError>> + Send {
        let result = self.tables.lock().unwrap().policies.get(&id).cloned();
        async { Ok(result) }
    }

    fn list_policies(
        &self,
    ) -> impl Future<Output = Result<Vec<OptimizationPolicy>, SunHashError>> + Send {
        let result = self.policies();
        async { Ok(result) }
    }

    fn save_policy(
        &self,
        policy: OptimizationPolicy,
    ) -> impl Future<Output = Result<OptimizationPolicy, SunHashError>> + Send {
        self.insert_policy(policy.clone());
        async { Ok(policy) }
    }

    fn delete_policy(
        &self,
        id: PolicyId,
    ) -> impl Future<Output = Result<(), SunHashError>> + Send {
        self.tables.lock().unwrap().policies.remove(&id);
        async { Ok(()) }
    }
}

impl EnergySourceRepository for InMemoryStore {
    fn get_energy_source(
        &self,
        id: EnergySourceId,
    ) -> impl Future<Output = Result<Option<EnergySource>, SunHashError>> + Send {
        let result = self.tables.lock().unwrap().sources.get(&id).cloned();
        async { Ok(result) }
    }

    fn list_energy_sources(
        &self,
    ) -> impl Future<Output = Result<Vec<EnergySource>, SunHashError>> + Send {
        let result: Vec<EnergySource> =
            self.tables.lock().unwrap().sources.values().cloned().collect();
        async { Ok(result) }
    }

    fn save_energy_source(
        &self,
        source: EnergySource,
    ) -> impl Future<Output = Result<EnergySource, SunHashError>> + Send {
        self.insert_energy_source(source.clone());
        async { Ok(source) }
    }

    fn delete_energy_source(
        &self,
        id: EnergySourceId,
    ) -> impl Future<Output = Result<(), SunHashError>> + Send {
        self.tables.lock().unwrap().sources.remove(&id);
        async { Ok(()) }
    }
}

impl OptimizationUnitRepository for InMemoryStore {
    fn get_unit(
        &self,
        id: OptimizationUnitId,
    ) -> impl Future<Output = Result<Option<OptimizationUnit>, SunHashError>> + Send {
        let mut tables = self.tables.lock().unwrap();
        let result = tables.units.get(&id).cloned();
        if let Some(queued) = tables.queued_unit.take() {
            tables.units.insert(queued.id, queued);
        }
        async { Ok(result) }
    }

    fn list_units(
        &self,
    ) -> impl Future<Output = Result<Vec<OptimizationUnit>, SunHashError>> + Send {
        let result: Vec<OptimizationUnit> =
            self.tables.lock().unwrap().units.values().cloned().collect();
        async { Ok(result) }
    }

    fn save_unit(
        &self,
        unit: OptimizationUnit,
    ) -> impl Future<Output = Result<OptimizationUnit, SunHashError>> + Send {
        self.insert_unit(unit.clone());
        async { Ok(unit) }
    }

    fn delete_unit(
        &self,
        id: OptimizationUnitId,
    ) -> impl Future<Output = Result<(), SunHashError>> + Send {
        self.tables.lock().unwrap().units.remove(&id);
        async { Ok(()) }
    }
}

struct ControllerState {
    reported: MinerStatus,
    failing: bool,
    commands: Vec<(MinerId, MinerCommand)>,
    status_reads: usize,
}

/// Controller that records commands and reports a fixed status.
#[derive(Clone)]
pub struct RecordingController {
    state: Arc<Mutex<ControllerState>>,
}

impl RecordingController {
    pub fn reporting(status: MinerStatus) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControllerState {
                reported: status,
                failing: false,
                commands: Vec::new(),
                status_reads: 0,
            })),
        }
    }

    pub fn set_reported(&self, status: MinerStatus) {
        self.state.lock().unwrap().reported = status;
    }

    pub fn fail_commands(&self) {
        self.state.lock().unwrap().failing = true;
    }

    pub fn accept_commands(&self) {
        self.state.lock().unwrap().failing = false;
    }

    pub fn commands(&self) -> Vec<(MinerId, MinerCommand)> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn status_reads(&self) -> usize {
        self.state.lock().unwrap().status_reads
    }

    fn record(&self, miner: MinerId, command: MinerCommand) -> Result<(), SunHashError> {
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(DataUnavailableError::new("miner controller", "connection refused").into());
        }
        state.commands.push((miner, command));
        Ok(())
    }
}

impl MinerController for RecordingController {
    fn turn_on(&self, miner: &Miner) -> impl Future<Output = Result<(), SunHashError>> + Send {
        let result = self.record(miner.id, MinerCommand::Start);
        async { result }
    }

    fn turn_off(&self, miner: &Miner) -> impl Future<Output = Result<(), SunHashError>> + Send {
        let result = self.record(miner.id, MinerCommand::Stop);
        async { result }
    }

    fn get_status(
        &self,
        _miner: &Miner,
    ) -> impl Future<Output = Result<MinerReading, SunHashError>> + Send {
        let mut state = self.state.lock().unwrap();
        state.status_reads += 1;
        let reading = MinerReading::status(state.reported);
        async move { Ok(reading) }
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(
        &self,
        _notifier: NotifierId,
        notification: Notification,
    ) -> impl Future<Output = Result<(), SunHashError>> + Send {
        self.sent.lock().unwrap().push(notification);
        async { Ok(()) }
    }
}

/// Input source answering with a fixed snapshot, or failing.
pub struct FixedInputs(Option<EnergyStateSnapshot>);

impl FixedInputs {
    pub fn available(snapshot: EnergyStateSnapshot) -> Self {
        Self(Some(snapshot))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }
}

impl CycleInputSource for FixedInputs {
    fn gather(
        &self,
        _unit: &OptimizationUnit,
        _source: &EnergySource,
        at: Timestamp,
    ) -> impl Future<Output = Result<CycleInputs, SunHashError>> + Send {
        let result = match &self.0 {
            Some(snapshot) => Ok(CycleInputs::new(snapshot.clone(), at)),
            None => Err(DataUnavailableError::new("energy monitor", "offline").into()),
        };
        async { result }
    }
}

pub struct FixedMonitor(pub EnergyStateSnapshot);

impl EnergyMonitor for FixedMonitor {
    fn get_current_energy_state(
        &self,
        _source: &EnergySource,
    ) -> impl Future<Output = Result<EnergyStateSnapshot, SunHashError>> + Send {
        let snapshot = self.0.clone();
        async { Ok(snapshot) }
    }
}

pub struct FailingMonitor;

impl EnergyMonitor for FailingMonitor {
    fn get_current_energy_state(
        &self,
        _source: &EnergySource,
    ) -> impl Future<Output = Result<EnergyStateSnapshot, SunHashError>> + Send {
        async { Err(DataUnavailableError::new("energy monitor", "offline").into()) }
    }
}

pub struct FixedForecast(Forecast);

impl FixedForecast {
    /// Two-hour linear ramp starting at noon.
    pub fn ramp(from: Watts, to: Watts) -> Self {
        let start = ts(12, 0);
        let end = start + TimeDelta::hours(2);
        let interval = ForecastInterval::new(
            start,
            end,
            vec![
                ForecastPowerPoint::new(start, from),
                ForecastPowerPoint::new(end, to),
            ],
        )
        .unwrap();
        Self(Forecast::new(start, vec![interval]))
    }
}

impl ForecastProvider for FixedForecast {
    fn get_forecast(
        &self,
        _source: &EnergySource,
        _at: Timestamp,
    ) -> impl Future<Output = Result<Option<Forecast>, SunHashError>> + Send {
        let forecast = self.0.clone();
        async { Ok(Some(forecast)) }
    }
}

/// Forecast provider that never answers.
pub struct HangingForecast;

impl ForecastProvider for HangingForecast {
    fn get_forecast(
        &self,
        _source: &EnergySource,
        _at: Timestamp,
    ) -> impl Future<Output = Result<Option<Forecast>, SunHashError>> + Send {
        std::future::pending()
    }
}

pub struct FixedTracker(pub HashRate);

impl PerformanceTracker for FixedTracker {
    fn get_current_hashrate(
        &self,
        _tracker: PerformanceTrackerId,
    ) -> impl Future<Output = Result<Option<HashRate>, SunHashError>> + Send {
        let hash_rate = self.0;
        async move { Ok(Some(hash_rate)) }
    }
}
