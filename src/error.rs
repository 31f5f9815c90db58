use thiserror::Error;

/// Main error type for the Stack-Compositor library
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Remote asset error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    NotFound { path: String },

    #[error("Failed to parse configuration file {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("No videos or images specified in configuration")]
    Empty,

    #[error("{kind} file not found: {path}")]
    MissingMedia { kind: String, path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },
}

/// Remote asset retrieval errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Not a recognized shareable link: {url}")]
    NotRecognized { url: String },

    #[error("Could not extract a file identifier from: {url}")]
    MalformedUrl { url: String },

    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Cache index error at {path}: {reason}")]
    Index { path: String, reason: String },
}

/// Probe and encode errors raised by the media engine
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to probe item {index} ({path}): {reason}")]
    ProbeFailed {
        index: usize,
        path: String,
        reason: String,
    },

    #[error("Encoding failed: {reason}")]
    EncodeFailed { reason: String },

    #[error("Unknown render backend: {name}")]
    UnknownBackend { name: String },
}

/// Convenience type alias for Results using CompositorError
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Whether the error came from the configuration stage
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(ConfigError::NotFound { path }) => {
                format!(
                    "Configuration file '{}' not found.\n\nTip: run without arguments to create an example config.",
                    path
                )
            }
            Self::Config(ConfigError::MissingMedia { kind, path }) => {
                format!(
                    "{} file '{}' does not exist. Check the path in your configuration.",
                    kind, path
                )
            }
            Self::Config(other) => {
                format!(
                    "{}\n\nTip: run without arguments to create an example config.",
                    other
                )
            }
            Self::Render(RenderError::UnknownBackend { name }) => {
                format!("Backend '{}' not found. Available backends: filtergraph, clips", name)
            }
            _ => self.to_string(),
        }
    }
}
