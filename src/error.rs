//! Error types for the card pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating a card
#[derive(Error, Debug)]
pub enum Error {
    /// The request was missing a URL or the URL is unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Failed to launch the browser or open a tab
    #[error("Session initialization failed: {0}")]
    InitializationError(String),

    /// Failed to navigate to the target URL
    #[error("Failed to load URL: {0}")]
    NavigationError(String),

    /// Navigation did not settle before the deadline
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Reading signals out of the rendered page failed
    #[error("Signal extraction failed: {0}")]
    ExtractionError(String),

    /// The page declares no `link[rel*="icon"]` element
    #[error("No favicon found")]
    NoFavicon,

    /// Network error while fetching an asset
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The favicon could not be decoded or resized
    #[error("Asset decoding failed: {0}")]
    AssetError(String),

    /// Drawing or encoding the card failed
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short name of the failure category, used when logging a collapsed failure.
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "input",
            Error::InitializationError(_) | Error::NavigationError(_) | Error::Timeout(_) => {
                "navigation"
            }
            Error::ExtractionError(_) | Error::NoFavicon => "extraction",
            Error::NetworkError(_) | Error::AssetError(_) => "asset",
            Error::RenderError(_) => "rendering",
            Error::ConfigError(_) => "config",
            #[cfg(feature = "cdp")]
            Error::CdpError(_) => "navigation",
            Error::Other(_) => "other",
        }
    }

    /// Whether the caller (rather than the pipeline) is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ExtractionError(format!("Malformed JSON: {}", err))
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::AssetError(err.to_string())
    }
}
