//! Manual miner start/stop and status refresh.

use std::time::Duration;

use sunhash_domain::error::{NotFoundError, SunHashError};
use sunhash_domain::id::MinerId;
use sunhash_domain::miner::{CommandEffect, Miner, MinerCommand, Observation};

use super::context_assembler::{DEFAULT_TIMEOUT, bounded};
use super::in_flight::InFlight;
use crate::ports::{MinerController, MinerRepository};

/// Operator-driven miner commands, outside of any policy.
///
/// Shares the [`InFlight`] set with the orchestrator so a manual command
/// never races a cycle on the same miner.
pub struct MinerActionService<R, C> {
    repo: R,
    controller: C,
    in_flight: InFlight,
    timeout: Duration,
}

impl<R: MinerRepository, C: MinerController> MinerActionService<R, C> {
    pub fn new(repo: R, controller: C) -> Self {
        Self {
            repo,
            controller,
            in_flight: InFlight::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_in_flight(mut self, in_flight: InFlight) -> Self {
        self.in_flight = in_flight;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Start a miner.
    ///
    /// Starting a miner that is on or starting changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`], [`SunHashError::Busy`] while a
    /// cycle holds the miner, [`SunHashError::Transition`] when the miner
    /// cannot start from its current state, or the controller's error.
    #[tracing::instrument(skip(self))]
    pub async fn start_miner(&self, id: MinerId) -> Result<Miner, SunHashError> {
        self.command(id, MinerCommand::Start).await
    }

    /// Stop a miner.
    ///
    /// # Errors
    ///
    /// Same as [`start_miner`](Self::start_miner).
    #[tracing::instrument(skip(self))]
    pub async fn stop_miner(&self, id: MinerId) -> Result<Miner, SunHashError> {
        self.command(id, MinerCommand::Stop).await
    }

    /// Read the hardware status and persist what it confirms.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`], [`SunHashError::Busy`], or the
    /// controller's error.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_status(&self, id: MinerId) -> Result<(Miner, Observation), SunHashError> {
        let _guard = self.in_flight.try_acquire(id).ok_or(SunHashError::Busy(id))?;
        let mut miner = self.load(id).await?;
        let observation = self.observe(&mut miner).await?;
        let miner = self.repo.save_miner_status(miner).await?;
        Ok((miner, observation))
    }

    async fn command(&self, id: MinerId, command: MinerCommand) -> Result<Miner, SunHashError> {
        let _guard = self.in_flight.try_acquire(id).ok_or(SunHashError::Busy(id))?;
        let mut miner = self.load(id).await?;
        if let Err(err) = self.observe(&mut miner).await {
            tracing::warn!(error = %err, "cannot read miner status, using stored status");
        }

        let mut next = miner.clone();
        if next.apply(command)? == CommandEffect::NoOp {
            tracing::info!(%command, status = %miner.status, "miner already there");
            return self.repo.save_miner_status(miner).await;
        }

        match command {
            MinerCommand::Start => {
                bounded(
                    "miner controller",
                    self.timeout,
                    self.controller.turn_on(&miner),
                )
                .await?;
            }
            MinerCommand::Stop => {
                bounded(
                    "miner controller",
                    self.timeout,
                    self.controller.turn_off(&miner),
                )
                .await?;
            }
        }
        tracing::info!(%command, "manual miner command sent");
        self.repo.save_miner_status(next).await
    }

    async fn observe(&self, miner: &mut Miner) -> Result<Observation, SunHashError> {
        let reading = bounded(
            "miner controller",
            self.timeout,
            self.controller.get_status(miner),
        )
        .await?;
        let observation = miner.observe(&reading);
        match observation {
            Observation::Reconciled { from, to } => {
                tracing::warn!(%from, %to, "miner status reconciled with controller");
            }
            Observation::Diverged { reported } => {
                tracing::warn!(status = %miner.status, %reported, "controller reading contradicts pending command");
            }
            _ => {}
        }
        Ok(observation)
    }

    async fn load(&self, id: MinerId) -> Result<Miner, SunHashError> {
        self.repo.get_miner(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Miner",
                id: id.to_string(),
            }
            .into()
        })
    }
}
