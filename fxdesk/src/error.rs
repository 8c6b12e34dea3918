use crate::{config::ConfigError, event::EventKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal simulation errors.
///
/// Recoverable conditions (schema violations, missing rates, decomposition failures) never reach
/// this type - they surface as output records and dispatch continues. A `DeskError` terminates
/// the run after a final `fatal_error` record is emitted.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum DeskError {
    #[error("duplicate event ordering key: {key:?}")]
    DuplicateEventKey { key: EventKey },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("engine invariant violated: {0}")]
    InvariantViolated(String),
}

impl From<ConfigError> for DeskError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
