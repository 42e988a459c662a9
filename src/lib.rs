//! Icon generator
//!
//! Offline asset generation for the map's icon atlas: each icon is a
//! parameterized SVG template that may reference remote resources (fonts,
//! stylesheets, images) through CSS `url(...)` functions. The generator
//! substitutes the template variables, inlines every remote reference as a
//! `data:` URL so the SVG is self-contained, and rasterizes the result to PNG
//! with a headless browser.
//!
//! # Pipeline
//!
//! - [`fetch::FetchCache`] memoizes remote resources for one run
//! - [`inline::Inliner`] replaces remote `url(...)` references, recursing into
//!   fetched text resources
//! - [`template::Renderer`] substitutes `{placeholder}` markers and inlines
//! - [`raster::Rasterizer`] paints the SVG through a [`raster::ScriptHost`]
//! - [`batch::BatchDriver`] walks a manifest and writes `.svg`/`.png` pairs
//!
//! # Example
//!
//! ```no_run
//! use icongen::{batch::BatchDriver, GeneratorConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = BatchDriver::with_defaults(GeneratorConfig::default())?;
//! let report = driver.run("icons/icons.toml".as_ref(), "build/icons".as_ref())?;
//! println!("wrote {} files", report.written.len());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod batch;
pub mod data_url;
pub mod fetch;
pub mod inline;
pub mod manifest;
pub mod raster;
pub mod template;

// Chrome DevTools Protocol script host
#[cfg(feature = "cdp")]
pub mod cdp;

/// Configuration for one generator run
///
/// The defaults reproduce the reference behavior: one icon at a time and the
/// whole batch aborts on the first failure.
///
/// # Examples
///
/// ```
/// let cfg = icongen::GeneratorConfig::default();
/// assert_eq!(cfg.jobs, 1);
/// assert_eq!(cfg.failure_policy, icongen::FailurePolicy::Abort);
/// ```
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// User agent string sent with resource fetches
    pub user_agent: String,
    /// Timeout for a single resource fetch in milliseconds
    pub fetch_timeout_ms: u64,
    /// Timeout for a single engine round trip in milliseconds
    pub raster_timeout_ms: u64,
    /// Headless browser window size
    pub viewport: Viewport,
    /// Explicit browser binary; auto-detected when `None`
    pub chrome_path: Option<PathBuf>,
    /// What to do when one manifest entry fails
    pub failure_policy: FailurePolicy,
    /// Number of icons processed concurrently
    pub jobs: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("icongen/", env!("CARGO_PKG_VERSION")).to_string(),
            fetch_timeout_ms: 30000,
            raster_timeout_ms: 30000,
            viewport: Viewport::default(),
            chrome_path: None,
            failure_policy: FailurePolicy::Abort,
            jobs: 1,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Batch behavior when a manifest entry fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failing entry and return its error
    #[default]
    Abort,
    /// Attempt every entry and collect failures in the report
    Continue,
}
