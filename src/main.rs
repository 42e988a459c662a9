use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use icongen::batch::BatchDriver;
use icongen::{FailurePolicy, GeneratorConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "icongen")]
#[command(about = "Render map icon templates to self-contained SVG and PNG")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one .svg and one .png per manifest entry
    Generate {
        /// Icons definitions file (TOML, or JSON with a .json extension)
        defs: PathBuf,

        /// Output directory
        out: PathBuf,

        /// Icons processed concurrently (0 = number of CPUs)
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,

        /// Keep generating after a failed icon and report all failures
        #[arg(short, long)]
        keep_going: bool,

        /// Per-request timeout for remote resources
        #[arg(long, default_value_t = 30000)]
        fetch_timeout_ms: u64,

        /// Per-call timeout for the headless browser
        #[arg(long, default_value_t = 30000)]
        raster_timeout_ms: u64,

        /// Chrome/Chromium binary (auto-detected by default)
        #[arg(long)]
        chrome: Option<PathBuf>,
    },
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            defs,
            out,
            jobs,
            keep_going,
            fetch_timeout_ms,
            raster_timeout_ms,
            chrome,
        } => {
            let config = GeneratorConfig {
                fetch_timeout_ms,
                raster_timeout_ms,
                chrome_path: chrome,
                failure_policy: if keep_going {
                    FailurePolicy::Continue
                } else {
                    FailurePolicy::Abort
                },
                jobs,
                ..Default::default()
            };

            let driver = BatchDriver::with_defaults(config).context("Failed to set up the generator")?;
            let report = driver
                .run(&defs, &out)
                .with_context(|| format!("Failed to generate icons from {}", defs.display()))?;

            for failure in &report.failures {
                eprintln!("{}: {}", failure.name, failure.error);
            }
            if !report.is_success() {
                bail!("{} icons failed", report.failures.len());
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
