use thiserror::Error;
use tokio::task::JoinError;

/// Failures raised by the admission gate itself.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    #[error("Gate capacity must be at least 1")]
    InvalidCapacity,

    #[error("Gate refill interval must be non-zero")]
    InvalidInterval,

    #[error("Gate must be created inside a Tokio runtime")]
    NoRuntime,

    /// The gate was shut down; surfaces from a dispatch as [`DispatchError::Cancelled`].
    #[error("Gate is shut down")]
    Cancelled,
}

/// Outcome of a dispatched submission that did not succeed.
///
/// `Cancelled` means the task never ran. `Task` carries the task's own error untouched.
#[derive(Error, Debug)]
pub enum DispatchError<E> {
    #[error("Submission cancelled: gate is shut down")]
    Cancelled,

    #[error("Submission failed: {0}")]
    Task(#[source] E),

    #[error("Submission aborted before completion: {0}")]
    Aborted(#[source] JoinError),
}

impl<E> DispatchError<E> {
    /// True when the task was never admitted.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchError::Cancelled)
    }

    pub fn task_error(&self) -> Option<&E> {
        match self {
            DispatchError::Task(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_task_error(self) -> Option<E> {
        match self {
            DispatchError::Task(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to create document: status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate gate error: {0}")]
    Gate(#[from] GateError),

    #[error("Initialization error: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
