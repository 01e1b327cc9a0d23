//! Command-line flags. Every flag is optional and overrides the value from
//! the config file and environment.

use clap::Parser;
use std::path::PathBuf;
use v2mine_core::{AppConfig, PersistPolicy};

/// Scrape public v2ray/xray share links, keep the ones that work.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "v2mine", version, about)]
pub struct Cli {
    /// Config file (TOML). Defaults to the platform config directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the listing site.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Number of index pages to scrape.
    #[arg(long)]
    pub pages: Option<u32>,

    /// HTTP request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub request_timeout: Option<f64>,

    /// Output list path.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Maximum concurrent tester invocations.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Tester timeout per configuration in seconds.
    #[arg(long, value_name = "SECS")]
    pub tester_timeout: Option<f64>,

    /// Keep prior list entries that were not re-tested in this run.
    #[arg(long)]
    pub merge: bool,

    /// Skip connectivity testing and keep every parsed configuration.
    #[arg(long)]
    pub no_test: bool,

    /// Print the resulting list to stdout instead of writing it.
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.base_url {
            config.scrape.base_url.clone_from(url);
        }
        if let Some(pages) = self.pages {
            config.scrape.pages = pages;
        }
        if let Some(secs) = self.request_timeout {
            config.scrape.request_timeout_secs = secs;
        }
        if let Some(path) = &self.output {
            config.output.path.clone_from(path);
        }
        if let Some(n) = self.concurrency {
            config.tester.concurrency = n;
        }
        if let Some(secs) = self.tester_timeout {
            config.tester.timeout_secs = secs;
        }
        if self.merge {
            config.output.policy = PersistPolicy::Merge;
        }
        if self.no_test {
            config.tester.enabled = false;
        }
    }
}
