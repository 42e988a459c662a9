//! Chrome DevTools Protocol script host (uses the `headless_chrome` crate)

use crate::raster::{unwrap_envelope, wrap_script, HostFactory, ScriptHost};
use crate::{Error, GeneratorConfig, Result};
use headless_chrome::browser::tab::Tab;
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A headless Chrome instance with a single tab.
///
/// Dropping the host drops the `Browser`, which terminates the child process.
pub struct CdpHost {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl CdpHost {
    pub fn launch(config: &GeneratorConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.raster_timeout_ms);

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .path(config.chrome_path.clone())
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .idle_browser_timeout(timeout.max(Duration::from_secs(30)))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {:#}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {:#}", e)))?;
        tab.set_default_timeout(timeout);

        debug!("launched headless browser");
        Ok(Self { _browser: browser, tab })
    }
}

impl ScriptHost for CdpHost {
    fn load_blank_page(&mut self) -> Result<()> {
        self.tab
            .navigate_to("about:blank")
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| Error::from(e.context("Navigation to about:blank failed")))?;
        Ok(())
    }

    fn run_script(&mut self, body: &str, args: &[Value]) -> Result<Value> {
        let remote = self
            .tab
            .evaluate(&wrap_script(body, args), true)
            .map_err(|e| Error::from(e.context("Evaluation failed")))?;

        let value = remote
            .value
            .ok_or_else(|| Error::RasterizeError("No value returned from evaluation".into()))?;
        let text = value
            .as_str()
            .ok_or_else(|| Error::RasterizeError(format!("Unexpected evaluation result: {}", value)))?;

        unwrap_envelope(text)
    }
}

/// Launches one `CdpHost` per rasterization
pub struct CdpHostFactory {
    config: GeneratorConfig,
}

impl CdpHostFactory {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }
}

impl HostFactory for CdpHostFactory {
    fn acquire(&self) -> Result<Box<dyn ScriptHost>> {
        Ok(Box::new(CdpHost::launch(&self.config)?))
    }
}
