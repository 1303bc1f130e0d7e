use thiserror::Error;

pub type Result<T> = std::result::Result<T, ActionError>;

/// Coarse classification of an [`ActionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidAmount,
    UnsupportedAsset,
    UnsupportedNetwork,
    InsufficientAllowance,
    PlanningFailed,
    TransactionFailed,
    UnexpectedError,
}

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Asset {asset} not supported on {network}")]
    UnsupportedAsset { asset: String, network: String },

    #[error("Network {0} is not supported")]
    UnsupportedNetwork(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: String, need: String },

    #[error("Insufficient balance. You have {have} {asset}, but need {need}")]
    InsufficientBalance {
        asset: String,
        have: String,
        need: String,
    },

    /// A protocol precondition the caller can fix (no collateral, open debt).
    #[error("{0}")]
    Precondition(String),

    #[error("Failed to {op}: {error}, {message}")]
    PlanningFailed {
        op: String,
        error: String,
        message: String,
    },

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Failed to {op}: step {step} of {total} ({description}) failed: {reason}")]
    StepFailed {
        op: String,
        /// 1-based position of the failed step.
        step: usize,
        total: usize,
        description: String,
        reason: String,
    },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            ActionError::UnsupportedAsset { .. } => ErrorKind::UnsupportedAsset,
            ActionError::UnsupportedNetwork(_) => ErrorKind::UnsupportedNetwork,
            ActionError::InsufficientAllowance { .. } => ErrorKind::InsufficientAllowance,
            ActionError::PlanningFailed { .. } => ErrorKind::PlanningFailed,
            ActionError::TransactionFailed(_) | ActionError::StepFailed { .. } => {
                ErrorKind::TransactionFailed
            }
            ActionError::InvalidArguments(_)
            | ActionError::UnknownAction(_)
            | ActionError::InsufficientBalance { .. }
            | ActionError::Precondition(_)
            | ActionError::Rpc(_)
            | ActionError::Http(_)
            | ActionError::Serialization(_)
            | ActionError::Config(_)
            | ActionError::Unexpected(_) => ErrorKind::UnexpectedError,
        }
    }

    /// Whether this failure is reported to the agent as text instead of
    /// propagating to the host.
    pub fn is_expected(&self) -> bool {
        !matches!(self, ActionError::Unexpected(_) | ActionError::Config(_))
    }
}

impl From<reqwest::Error> for ActionError {
    fn from(e: reqwest::Error) -> Self {
        ActionError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(e: serde_json::Error) -> Self {
        ActionError::Serialization(e.to_string())
    }
}
