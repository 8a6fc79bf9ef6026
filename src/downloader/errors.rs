// Error types for the download pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Empty or malformed URL, or a URL from another platform
    #[error("{0}")]
    InvalidInput(String),

    /// Identifier or media URL could not be obtained
    #[error("{0}")]
    Resolution(String),

    /// Network or filesystem failure mid-download
    #[error("Download failed: {0}")]
    Transfer(String),

    /// Settings unreadable/unwritable, output directory uncreatable
    #[error("{0}")]
    Configuration(String),

    /// A download is already in flight
    #[error("A download is already in progress")]
    Busy,

    /// Engine name not present in the registry
    #[error("Unknown download engine: {0}")]
    UnknownEngine(String),

    /// yt-dlp binary missing or not executable
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Download failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl DownloadError {
    /// Text shown to the user. There are no machine-readable codes.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
