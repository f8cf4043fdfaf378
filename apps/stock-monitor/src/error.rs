use thiserror::Error;

/// Reasons a polling cycle aborts. None of them are fatal to the process: the
/// monitor logs the error and leaves the dashboard as it was.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed feed response: {0}")]
    MalformedResponse(String),
    #[error("insufficient data: {valid} valid point(s), need at least {required}")]
    InsufficientData { valid: usize, required: usize },
}

impl CycleError {
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::Transport(_) => "transport",
            CycleError::MalformedResponse(_) => "malformed_response",
            CycleError::InsufficientData { .. } => "insufficient_data",
        }
    }
}
