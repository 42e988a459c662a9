//! Error types for the icon generator

use thiserror::Error;

/// Result type alias for generator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating icons
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing manifest, or a malformed entry in it
    #[error("Invalid manifest: {0}")]
    ManifestError(String),

    /// Missing template or unresolved placeholder
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Network or HTTP failure while resolving a remote resource
    #[error("Fetch failed: {0}")]
    FetchError(String),

    /// A payload or media type that cannot be turned into (or read from) a data URL
    #[error("Encoding failed: {0}")]
    EncodeError(String),

    /// Degenerate or empty raster output, or a failed engine round trip
    #[error("Rasterization failed: {0}")]
    RasterizeError(String),

    /// The rendering engine could not be launched
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to write an output file
    #[error("Failed to write output: {0}")]
    OutputError(String),
}

impl Error {
    /// Short kind label used in logs and batch reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ManifestError(_) => "manifest",
            Error::TemplateError(_) => "template",
            Error::FetchError(_) => "fetch",
            Error::EncodeError(_) => "encode",
            Error::RasterizeError(_) => "rasterize",
            Error::InitializationError(_) => "init",
            Error::OutputError(_) => "output",
        }
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        if err.downcast_ref::<headless_chrome::util::Timeout>().is_some() {
            return Error::RasterizeError(format!("engine round trip timed out: {:#}", err));
        }
        Error::RasterizeError(format!("{:#}", err))
    }
}
