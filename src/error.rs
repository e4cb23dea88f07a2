//! Error types for the radio plugin

/// Result type alias for plugin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while controlling playback
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No external player was found at load time
    #[error("No player found. Install MPV or VLC in Desktop Mode (Discover), then reopen the plugin.")]
    NoPlayer,

    /// The player process could not be launched
    #[error("Failed to start player: {0}")]
    Spawn(#[source] std::io::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The metadata document did not have the expected shape
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    /// Control socket I/O failed
    #[error("Control socket error: {0}")]
    Ipc(#[source] std::io::Error),

    /// Control socket did not answer in time
    #[error("Control socket timeout")]
    IpcTimeout,

    /// Invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a malformed-metadata error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedMetadata(msg.into())
    }
}
