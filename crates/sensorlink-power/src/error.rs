//! Power-state subsystem errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PowerError {
    #[error("power-state source {0} already subscribed")]
    AlreadySubscribed(String),

    #[error("power-state source {0} has no publisher")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
