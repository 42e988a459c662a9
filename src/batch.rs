//! Batch driver: one `.svg` and one `.png` per manifest entry.

use crate::fetch::FetchCache;
use crate::manifest::{IconDefinition, Manifest};
use crate::raster::{HostFactory, Rasterizer};
use crate::template::Renderer;
use crate::{Error, FailurePolicy, GeneratorConfig, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// A manifest entry that could not be generated
#[derive(Debug)]
pub struct EntryFailure {
    pub name: String,
    pub error: Error,
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Files written, in manifest order
    pub written: Vec<PathBuf>,
    /// Failed entries (only populated under `FailurePolicy::Continue`)
    pub failures: Vec<EntryFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives the pipeline over a manifest.
///
/// The fetch cache lives as long as the driver, so a resource shared by
/// several icons is downloaded once per run.
pub struct BatchDriver {
    config: GeneratorConfig,
    cache: FetchCache,
    hosts: Box<dyn HostFactory>,
}

impl BatchDriver {
    pub fn new(config: GeneratorConfig, cache: FetchCache, hosts: Box<dyn HostFactory>) -> Self {
        Self { config, cache, hosts }
    }

    /// HTTP fetching and headless Chrome rasterization
    #[cfg(feature = "cdp")]
    pub fn with_defaults(config: GeneratorConfig) -> Result<Self> {
        let cache = FetchCache::new(crate::fetch::HttpFetcher::new(&config)?);
        let hosts = Box::new(crate::cdp::CdpHostFactory::new(config.clone()));
        Ok(Self::new(config, cache, hosts))
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    /// Load `manifest_path` and generate every icon into `output_dir`.
    pub fn run(&self, manifest_path: &Path, output_dir: &Path) -> Result<BatchReport> {
        let manifest = Manifest::load(manifest_path)?;
        info!("{}: {} icons", manifest_path.display(), manifest.len());
        self.run_manifest(&manifest, output_dir)
    }

    pub fn run_manifest(&self, manifest: &Manifest, output_dir: &Path) -> Result<BatchReport> {
        fs::create_dir_all(output_dir)
            .map_err(|e| Error::OutputError(format!("{}: {}", output_dir.display(), e)))?;

        let abort = self.config.failure_policy == FailurePolicy::Abort;
        let jobs = match self.config.jobs {
            0 => num_cpus::get(),
            n => n,
        }
        .min(manifest.len())
        .max(1);

        let next = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let outcomes = Mutex::new(Vec::with_capacity(manifest.len()));

        let work = || loop {
            if abort && stop.load(Ordering::SeqCst) {
                break;
            }
            let index = next.fetch_add(1, Ordering::SeqCst);
            let Some(icon) = manifest.icons.get(index) else { break };

            let outcome = self.generate(icon, output_dir);
            if outcome.is_err() {
                stop.store(true, Ordering::SeqCst);
            }
            outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((index, outcome));
        };

        if jobs == 1 {
            work();
        } else {
            info!("generating with {} workers", jobs);
            std::thread::scope(|s| {
                for _ in 0..jobs {
                    s.spawn(&work);
                }
            });
        }

        let mut outcomes = outcomes.into_inner().unwrap_or_else(PoisonError::into_inner);
        outcomes.sort_by_key(|(index, _)| *index);

        let mut report = BatchReport::default();
        for (index, outcome) in outcomes {
            let name = &manifest.icons[index].name;
            match outcome {
                Ok(paths) => report.written.extend(paths),
                Err(error) if abort => return Err(error),
                Err(error) => {
                    warn!("{}: {} error: {}", name, error.kind(), error);
                    report.failures.push(EntryFailure {
                        name: name.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "generated {} files, {} failed icons, {} remote resources",
            report.written.len(),
            report.failures.len(),
            self.cache.len()
        );
        Ok(report)
    }

    /// Render, write the SVG, rasterize it and write the PNG.
    pub fn generate(&self, icon: &IconDefinition, output_dir: &Path) -> Result<[PathBuf; 2]> {
        let svg = Renderer::new(&self.cache).render(&icon.template_path, &icon.variables)?;
        let svg_path = output_dir.join(format!("{}.svg", icon.name));
        write_output(&svg_path, svg.as_bytes())?;

        let png = Rasterizer::new(self.hosts.as_ref()).rasterize(&svg)?;
        let png_path = output_dir.join(format!("{}.png", icon.name));
        write_output(&png_path, &png)?;

        Ok([svg_path, png_path])
    }
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).map_err(|e| Error::OutputError(format!("{}: {}", path.display(), e)))?;
    info!("wrote {}", path.display());
    Ok(())
}
