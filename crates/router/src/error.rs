//! Router error types

use contracts::ContractError;
use thiserror::Error;

/// Errors raised while arming or reloading the router
///
/// Event processing itself never fails.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A route targets a receiver missing from the registry
    #[error("route '{route}' references unknown receiver '{name}'")]
    UnknownReceiver { route: String, name: String },

    /// Route tree could not be compiled
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl From<RouterError> for ContractError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::UnknownReceiver { route, name } => Self::UnknownReceiver { route, name },
            RouterError::Contract(inner) => inner,
        }
    }
}
