//! Error taxonomy for the healing pipeline

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by decision, execution, recovery and storage operations.
#[derive(Debug, Error)]
pub enum HealError {
    /// Malformed or missing required field in a request
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Action value not recognized by the executor
    ///
    /// Recovered locally as a no-op; never returned from the executor.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A cluster-management call failed or returned unusable output
    #[error("{operation} failed: {message}")]
    ExternalCommand { operation: String, message: String },

    /// A cluster-management call did not finish in time
    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout { operation: String, after: Duration },

    /// The sweep was aborted through its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// No Kubernetes backend is configured
    #[error("cluster client not configured")]
    ClusterUnavailable,

    /// Ledger or metrics store unavailable
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl HealError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        HealError::InvalidInput(message.into())
    }

    pub fn external(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        HealError::ExternalCommand {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn persistence(message: impl std::fmt::Display) -> Self {
        HealError::Persistence(message.to_string())
    }

    /// Whether the caller may retry the same operation later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HealError::ExternalCommand { .. } | HealError::Timeout { .. }
        )
    }

    /// Short machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            HealError::InvalidInput(_) => "invalid_input",
            HealError::UnknownAction(_) => "unknown_action",
            HealError::ExternalCommand { .. } => "external_command_failure",
            HealError::Timeout { .. } => "timeout",
            HealError::Cancelled => "cancelled",
            HealError::ClusterUnavailable => "cluster_unavailable",
            HealError::Persistence(_) => "persistence_failure",
        }
    }
}

pub type HealResult<T> = std::result::Result<T, HealError>;
