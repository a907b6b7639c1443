use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("missing credential field: {0}")]
    MissingCredentialField(&'static str),
    #[error("{0}")]
    Other(String),
}

/// OAuth lifecycle failures (spec component C3).
#[derive(Debug, Clone, Error)]
pub enum OAuthError {
    #[error("no credential on disk for this provider")]
    NoToken,
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("interactive acquisition required but not permitted in this context")]
    InteractiveRequired,
    #[error("interactive acquisition failed: {0}")]
    InteractiveFailed(String),
    #[error("token file io error: {0}")]
    Io(String),
}
