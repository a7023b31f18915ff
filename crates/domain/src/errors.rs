use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Connection failed to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("No resolved address available on this worker for cluster '{0}'")]
    NoResolvedAddress(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::IoError(e.to_string())
    }
}
