//! Error types for QR rasterization and export

use thiserror::Error;

/// Result type alias for qrcanvas operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating, rasterizing or exporting a symbol
#[derive(Error, Debug)]
pub enum Error {
    /// Source text is empty or too long
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The symbol source rejected the text/level combination
    #[error("Encoding failed: {0}")]
    EncodingError(String),

    /// Raster configuration cannot produce an image
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Module grid is empty or malformed
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// Requested export format is not one of png, jpeg or svg
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Export or print requested before anything was generated
    #[error("No active symbol; generate one first")]
    NoActiveSymbol,

    /// Clipboard sink failure
    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    /// Download/print sink failure
    #[error("Platform error: {0}")]
    PlatformError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error should be shown to the user rather than treated as a
    /// programming mistake.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Error::InvalidConfig(_) | Error::InvalidGrid(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::PlatformError(err.to_string())
    }
}
