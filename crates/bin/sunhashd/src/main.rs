//! # sunhashd
//!
//! Composition root that wires all adapters together and runs the
//! optimization scheduler.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and install logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Seed energy sources, miners, policies and units from the bootstrap file
//! - Construct the simulated collaborators (adapters)
//! - Construct application services, injecting repositories and collaborators via port traits
//! - Run every enabled unit on a fixed interval
//! - Handle graceful shutdown (SIGINT): a running cycle completes first
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod bootstrap;
mod config;

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use sunhash_adapter_storage_sqlite_sqlx::SqliteStore;
use sunhash_adapter_storage_sqlite_sqlx::pool::Config as DatabaseConfig;
use sunhash_adapter_virtual::{
    Location, SolarProfile, SunCalculator, TracingNotifier, VirtualEnergyMonitor,
    VirtualForecastProvider, VirtualHomeForecast, VirtualMinerController,
    VirtualPerformanceTracker,
};
use sunhash_app::ports::{MinerController, Notifier};
use sunhash_app::services::configuration_service::ConfigurationService;
use sunhash_app::services::context_assembler::{ContextAssembler, CycleInputSource};
use sunhash_app::services::optimization_service::{CycleReport, MinerAction, OptimizationService};
use sunhash_domain::units::{Percentage, Watts};

use crate::bootstrap::{Collaborators, Seed};
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = DatabaseConfig {
        database_url: config.database.url.clone(),
    }
    .build()
    .await
    .with_context(|| format!("opening database {}", config.database.url))?;
    let store = db.store();

    // Seed
    let collaborators = Collaborators::default();
    if let Some(path) = &config.bootstrap.path {
        let seed = Seed::from_file(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        let seeded = seed
            .apply(&ConfigurationService::new(store.clone()), &collaborators)
            .await
            .with_context(|| format!("applying seed file {}", path.display()))?;
        tracing::info!(
            energy_sources = seeded.energy_sources,
            miners = seeded.miners,
            policies = seeded.policies,
            units = seeded.units,
            "seed applied"
        );
    }

    // Collaborators
    let location = Location::new(config.location.latitude, config.location.longitude)
        .context("invalid location")?;
    let sun = SunCalculator::new(location);
    let profile = SolarProfile {
        peak_production: Watts(config.simulation.peak_production_watts),
        base_load: Watts(config.simulation.base_load_watts),
    };
    let controller =
        VirtualMinerController::default().with_confirmation_polls(config.simulation.confirmation_polls);

    let inputs = ContextAssembler::new(
        VirtualEnergyMonitor::new(sun, profile)
            .with_initial_state_of_charge(Percentage(config.simulation.initial_state_of_charge)),
        VirtualForecastProvider::new(sun, profile),
        VirtualHomeForecast::new(profile, location.longitude()),
        VirtualPerformanceTracker::new(controller.clone()),
        sun,
    )
    .with_timeout(config.scheduler.collaborator_timeout())
    .with_utc_offset(config.location.utc_offset());

    // Services
    let optimization = OptimizationService::new(store, inputs, controller, TracingNotifier)
        .with_command_timeout(config.scheduler.collaborator_timeout());

    tracing::info!(
        interval_secs = config.scheduler.interval_secs,
        latitude = location.latitude(),
        longitude = location.longitude(),
        "sunhashd started"
    );
    schedule(&optimization, config.scheduler.interval()).await?;
    tracing::info!("sunhashd stopped");

    Ok(())
}

/// Run every enabled unit once per `interval` until interrupted.
///
/// The shutdown signal is only watched between cycles.
async fn schedule<A, C, N>(
    optimization: &OptimizationService<SqliteStore, A, C, N>,
    interval: std::time::Duration,
) -> anyhow::Result<()>
where
    A: CycleInputSource,
    C: MinerController,
    N: Notifier,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("listening for shutdown signal")?;
                tracing::info!("shutdown requested");
                return Ok(());
            }
            _ = ticker.tick() => {
                match optimization.run_all_enabled_units().await {
                    Ok(reports) => reports.iter().for_each(log_report),
                    Err(err) => tracing::error!(error = %err, "cannot list optimization units"),
                }
            }
        }
    }
}

fn log_report(report: &CycleReport) {
    let count = |pred: fn(&MinerAction) -> bool| {
        report.outcomes.iter().filter(|o| pred(&o.action)).count()
    };
    tracing::info!(
        unit_id = %report.unit_id,
        miners = report.outcomes.len(),
        started = count(|a| *a == MinerAction::Started),
        stopped = count(|a| *a == MinerAction::Stopped),
        failed = count(|a| matches!(a, MinerAction::CommandFailed(_))),
        skipped = count(|a| matches!(a, MinerAction::Skipped(_))),
        "cycle complete"
    );
}
