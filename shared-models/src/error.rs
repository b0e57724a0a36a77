use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Configuration Error: {0}")]
    Config(String),
    #[error("Network Error: {0}")]
    Network(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Rate limited, gave up after {0} waits")]
    RateLimited(u32),
    #[error("API Error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Serialization Error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache Error: {0}")]
    Cache(String),
    #[error("No interaction data found for @{0}")]
    NoInteractionData(String),
}

impl ModelError {
    /// Conditions a signal or partner fetch absorbs instead of aborting the run.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            ModelError::Forbidden(_)
                | ModelError::Unauthorized(_)
                | ModelError::RateLimited(_)
                | ModelError::Api { .. }
                | ModelError::Network(_)
                | ModelError::Serde(_)
        )
    }
}

pub type Result<T, E = ModelError> = std::result::Result<T, E>;
