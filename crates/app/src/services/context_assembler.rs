//! Gathers everything a decision needs from the collaborators.
//!
//! All collaborators are queried concurrently, each bounded by its own
//! timeout. Only the energy state is mandatory: any optional source that
//! fails, times out or is not configured is left out of the context.

use std::future::Future;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use sunhash_domain::energy::{EnergySource, EnergyStateSnapshot};
use sunhash_domain::error::{DataUnavailableError, SunHashError};
use sunhash_domain::forecast::Forecast;
use sunhash_domain::home_load::ConsumptionForecast;
use sunhash_domain::miner::{HashRate, Miner};
use sunhash_domain::optimization_unit::OptimizationUnit;
use sunhash_domain::policy::DecisionalContext;
use sunhash_domain::sun::Sun;
use sunhash_domain::time::Timestamp;

use crate::ports::{
    EnergyMonitor, ForecastProvider, HomeForecastProvider, PerformanceTracker, SunProvider,
};

/// Default bound for a single collaborator call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Data gathered once per cycle and shared by every miner of the unit.
#[derive(Debug, Clone)]
pub struct CycleInputs {
    pub timestamp: Timestamp,
    pub utc_offset: FixedOffset,
    pub energy_state: EnergyStateSnapshot,
    pub forecast: Option<Forecast>,
    pub home_load_forecast: Option<ConsumptionForecast>,
    pub tracker_hash_rate: Option<HashRate>,
    pub sun: Option<Sun>,
}

impl CycleInputs {
    /// Inputs with only the mandatory energy state.
    #[must_use]
    pub fn new(energy_state: EnergyStateSnapshot, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            utc_offset: Utc.fix(),
            energy_state,
            forecast: None,
            home_load_forecast: None,
            tracker_hash_rate: None,
            sun: None,
        }
    }

    /// Build the decisional context for one miner.
    #[must_use]
    pub fn context_for<'a>(
        &'a self,
        source: &'a EnergySource,
        miner: &'a Miner,
    ) -> DecisionalContext<'a> {
        DecisionalContext::new(source, &self.energy_state, miner, self.timestamp)
            .with_forecast(self.forecast.as_ref())
            .with_home_load_forecast(self.home_load_forecast.as_ref())
            .with_tracker_hash_rate(self.tracker_hash_rate)
            .with_sun(self.sun.as_ref())
            .with_utc_offset(self.utc_offset)
    }
}

/// Source of [`CycleInputs`] for the orchestrator.
pub trait CycleInputSource: Send + Sync {
    /// Gather the inputs of one cycle of `unit`.
    ///
    /// Fails only when the energy state cannot be read.
    fn gather(
        &self,
        unit: &OptimizationUnit,
        source: &EnergySource,
        at: Timestamp,
    ) -> impl Future<Output = Result<CycleInputs, SunHashError>> + Send;
}

/// [`CycleInputSource`] backed by the collaborator ports.
pub struct ContextAssembler<M, F, H, T, S> {
    monitor: M,
    forecast: F,
    home_forecast: H,
    tracker: T,
    sun: S,
    timeout: Duration,
    utc_offset: FixedOffset,
}

impl<M, F, H, T, S> ContextAssembler<M, F, H, T, S> {
    pub fn new(monitor: M, forecast: F, home_forecast: H, tracker: T, sun: S) -> Self {
        Self {
            monitor,
            forecast,
            home_forecast,
            tracker,
            sun,
            timeout: DEFAULT_TIMEOUT,
            utc_offset: Utc.fix(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Offset used by time-of-day clauses.
    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

impl<M, F, H, T, S> CycleInputSource for ContextAssembler<M, F, H, T, S>
where
    M: EnergyMonitor,
    F: ForecastProvider,
    H: HomeForecastProvider,
    T: PerformanceTracker,
    S: SunProvider,
{
    #[tracing::instrument(skip_all, fields(unit_id = %unit.id, energy_source_id = %source.id))]
    async fn gather(
        &self,
        unit: &OptimizationUnit,
        source: &EnergySource,
        at: Timestamp,
    ) -> Result<CycleInputs, SunHashError> {
        let energy_state = async {
            if source.energy_monitor_id.is_some() {
                bounded(
                    "energy monitor",
                    self.timeout,
                    self.monitor.get_current_energy_state(source),
                )
                .await
            } else {
                Err(SunHashError::from(DataUnavailableError::new(
                    "energy monitor",
                    format!("energy source {} has no monitor", source.id),
                )))
            }
        };
        let forecast = optional("forecast provider", self.timeout, async {
            match source.forecast_provider_id {
                Some(_) => self.forecast.get_forecast(source, at).await,
                None => Ok(None),
            }
        });
        let home_load_forecast = optional("home forecast provider", self.timeout, async {
            match unit.home_forecast_provider_id {
                Some(provider) => {
                    self.home_forecast
                        .get_home_consumption_forecast(provider, at)
                        .await
                }
                None => Ok(None),
            }
        });
        let tracker_hash_rate = optional("performance tracker", self.timeout, async {
            match unit.performance_tracker_id {
                Some(tracker) => self.tracker.get_current_hashrate(tracker).await,
                None => Ok(None),
            }
        });
        let sun = optional("sun provider", self.timeout, self.sun.get_sun(at));

        let (energy_state, forecast, home_load_forecast, tracker_hash_rate, sun) = tokio::join!(
            energy_state,
            forecast,
            home_load_forecast,
            tracker_hash_rate,
            sun
        );
        let energy_state = energy_state?;

        tracing::debug!(
            production = %energy_state.production,
            has_forecast = forecast.is_some(),
            has_home_load_forecast = home_load_forecast.is_some(),
            has_tracker_hash_rate = tracker_hash_rate.is_some(),
            has_sun = sun.is_some(),
            "cycle inputs gathered"
        );

        Ok(CycleInputs {
            timestamp: at,
            utc_offset: self.utc_offset,
            energy_state,
            forecast,
            home_load_forecast,
            tracker_hash_rate,
            sun,
        })
    }
}

/// Run `call` with a deadline, turning a timeout into [`DataUnavailableError`].
pub(crate) async fn bounded<V>(
    source_name: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<V, SunHashError>>,
) -> Result<V, SunHashError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DataUnavailableError::new(
            source_name,
            format!("no answer within {} ms", limit.as_millis()),
        )
        .into()),
    }
}

/// Like [`bounded`] but any failure degrades to `None`.
async fn optional<V>(
    source_name: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<Option<V>, SunHashError>>,
) -> Option<V> {
    match bounded(source_name, limit, call).await {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(source = source_name, error = %err, "omitting optional input");
            None
        }
    }
}
