//! v2mine application shell.
//!
//! Thin layer over the workspace crates: parses flags, layers
//! configuration, installs logging and maps the run result to an exit code.
//! The actual work lives in `crates/`.

#![warn(clippy::all)]

pub mod cli;

pub use cli::Cli;

use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use v2mine_core::AppConfig;
use v2mine_pipeline::{Pipeline, PipelineError};
use v2mine_scraper::Scraper;
use v2mine_tester::{ConnectivityTester, PassThroughTester, SubprocessTester};

/// Exit code for a successful run, including one with zero results.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code for fatal errors.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code when the run was interrupted.
pub const EXIT_CANCELLED: u8 = 130;

/// Initialize tracing subscriber for logging. Logs go to stderr so that
/// `--dry-run` output on stdout stays clean.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,v2mine=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Defaults, then the config file, then the environment, then flags.
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load_with_env(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Execute one run. Returns once the list is written (or printed).
pub async fn run(cli: Cli, cancel: CancellationToken) -> anyhow::Result<()> {
    info!("Starting v2mine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    tracing::debug!("Effective configuration:\n{}", config.to_toml()?);

    let tester: Arc<dyn ConnectivityTester> = if config.tester.enabled {
        Arc::new(SubprocessTester::new(&config.tester)?)
    } else {
        info!("Connectivity testing disabled, keeping every parsed configuration");
        Arc::new(PassThroughTester)
    };

    let scraper = Scraper::new(&config.scrape)?;
    let report = Pipeline::from_config(&config, tester)
        .with_dry_run(cli.dry_run)
        .with_cancellation(cancel)
        .run(scraper)
        .await?;

    if cli.dry_run {
        for line in &report.output {
            println!("{line}");
        }
    } else {
        info!(
            path = %config.output.path.display(),
            working = report.passed(),
            "Wrote working configurations"
        );
    }
    Ok(())
}

/// Map a run failure to the process exit code.
#[must_use]
pub fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<PipelineError>() {
        Some(PipelineError::Cancelled) => EXIT_CANCELLED,
        _ => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&anyhow::Error::new(PipelineError::Cancelled)), 130);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), EXIT_FAILURE);

        let wrapped = anyhow::Error::new(PipelineError::Cancelled).context("while running");
        assert_eq!(exit_code(&wrapped), EXIT_CANCELLED);
    }

    #[test]
    fn test_invalid_flags_fail_validation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").expect("write config");

        let cli = Cli {
            config: Some(path),
            pages: Some(0),
            ..Cli::default()
        };
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("scrape.pages"));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let cli = Cli {
            config: Some("/nonexistent/v2mine.toml".into()),
            ..Cli::default()
        };
        assert!(load_config(&cli).is_err());
    }
}
