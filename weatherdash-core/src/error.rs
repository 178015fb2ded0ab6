use thiserror::Error;

/// User-facing refusals from the city registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{0}' is already in your saved cities")]
    DuplicateCity(String),

    /// Carries the capacity that was reached.
    #[error("Maximum {0} cities allowed. Delete one to add another.")]
    RegistryFull(usize),
}

#[derive(Debug, Error)]
pub enum Error {
    /// Network, HTTP status or body-shape failure from a weather or geolocation service.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Missing API key or malformed query, raised before any request is sent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller should offer a retry instead of giving up on the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Provider(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
