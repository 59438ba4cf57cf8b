//! Errors raised by the simulated collaborators.

use sunhash_domain::error::SunHashError;
use sunhash_domain::id::MinerId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VirtualError {
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),

    /// The simulated miner was marked unreachable.
    #[error("miner {0} does not answer")]
    Unreachable(MinerId),
}

impl From<VirtualError> for SunHashError {
    fn from(err: VirtualError) -> Self {
        Self::Adapter(Box::new(err))
    }
}
