use thiserror::Error;

#[derive(Error, Debug)]
pub enum LingoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid locale code: '{0}'")]
    InvalidLocale(String),

    #[error("Translation disabled: no API key configured")]
    Disabled,

    #[error("Bridge directory not found at {0}")]
    BackendNotFound(String),

    #[error("Failed to install bridge dependencies: {0}")]
    DependencyInstall(String),

    #[error("Failed to start bridge server: {0}")]
    Spawn(String),

    #[error("Bridge server not ready after {0} ms")]
    BackendNotReady(u64),

    #[error("Bridge process error: {0}")]
    Process(String),

    #[error("Bridge returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Bridge reported an error: {0}")]
    Backend(String),

    #[error("Unexpected response format: {0}")]
    MalformedResponse(String),
}

impl LingoError {
    /// Whether another attempt at the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Io(_)
                | Self::Json(_)
                | Self::Status { .. }
                | Self::Backend(_)
                | Self::MalformedResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LingoError>;
