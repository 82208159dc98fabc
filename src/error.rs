//! Error types for deal construction, scenario validation and file loading

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AbsError>;

/// Errors raised when a deal or scenario is misconfigured.
///
/// Transient numeric conditions during a projection (zero note balance after
/// full paydown, empty fee basis) are never errors; they fall back to zero.
#[derive(Debug, Error)]
pub enum AbsError {
    #[error("deal '{0}' has no tranches")]
    EmptyTranches(String),

    #[error("duplicate tranche name: {0}")]
    DuplicateTranche(String),

    #[error("tranche not found: {0}")]
    TrancheNotFound(String),

    #[error("invalid collateral: {0}")]
    InvalidCollateral(String),

    #[error("invalid scenario '{name}': {reason}")]
    InvalidScenario { name: String, reason: String },

    #[error("invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("unknown deal template: {0}")]
    UnknownTemplate(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AbsError {
    pub(crate) fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AbsError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_scenario(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AbsError::InvalidScenario {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
