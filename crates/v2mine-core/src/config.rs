//! Configuration management for v2mine.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. The resulting [`AppConfig`] is built once
//! at startup and passed by reference into every component; nothing reads
//! settings from ambient state afterwards.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/v2mine/config.toml` (or platform equivalent)
/// unless an explicit path is given. If the file doesn't exist, default values
/// are used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listing site scraping settings
    pub scrape: ScrapeConfig,
    /// External tester settings
    pub tester: TesterConfig,
    /// Output list settings
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults
    /// if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration (explicit path or default location) with
    /// environment variable overrides applied on top.
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup function.
    ///
    /// Supports the following variables:
    /// - `BASE_URL`: listing site base URL
    /// - `PAGES_TO_SCRAPE`: number of index pages (positive integer)
    /// - `REQUEST_TIMEOUT`: HTTP request timeout in seconds (positive number)
    /// - `V2MINE_OUTPUT`: output list path
    /// - `V2MINE_TESTER_TIMEOUT`: tester subprocess timeout in seconds
    /// - `V2MINE_CONCURRENCY`: maximum concurrent tester invocations
    ///
    /// Unlike a malformed config file entry, a malformed variable is an
    /// error rather than being silently ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("BASE_URL") {
            tracing::debug!("Override scrape.base_url from env: {}", val);
            self.scrape.base_url = val;
        }

        if let Some(val) = lookup("PAGES_TO_SCRAPE") {
            self.scrape.pages = parse_env("PAGES_TO_SCRAPE", &val)?;
            tracing::debug!("Override scrape.pages from env: {}", self.scrape.pages);
        }

        if let Some(val) = lookup("REQUEST_TIMEOUT") {
            self.scrape.request_timeout_secs = parse_env("REQUEST_TIMEOUT", &val)?;
            tracing::debug!(
                "Override scrape.request_timeout_secs from env: {}",
                self.scrape.request_timeout_secs
            );
        }

        if let Some(val) = lookup("V2MINE_OUTPUT") {
            tracing::debug!("Override output.path from env: {}", val);
            self.output.path = PathBuf::from(val);
        }

        if let Some(val) = lookup("V2MINE_TESTER_TIMEOUT") {
            self.tester.timeout_secs = parse_env("V2MINE_TESTER_TIMEOUT", &val)?;
            tracing::debug!(
                "Override tester.timeout_secs from env: {}",
                self.tester.timeout_secs
            );
        }

        if let Some(val) = lookup("V2MINE_CONCURRENCY") {
            self.tester.concurrency = parse_env("V2MINE_CONCURRENCY", &val)?;
            tracing::debug!(
                "Override tester.concurrency from env: {}",
                self.tester.concurrency
            );
        }

        Ok(())
    }

    /// Check every value that has a constraint beyond its type.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scrape.base_url.trim().is_empty() {
            return Err(invalid("scrape.base_url", "must not be empty"));
        }
        if self.scrape.pages == 0 {
            return Err(invalid("scrape.pages", "must be at least 1"));
        }
        if !(self.scrape.request_timeout_secs.is_finite() && self.scrape.request_timeout_secs > 0.0)
        {
            return Err(invalid(
                "scrape.request_timeout_secs",
                "must be a positive number of seconds",
            ));
        }
        if !(self.tester.timeout_secs.is_finite() && self.tester.timeout_secs > 0.0) {
            return Err(invalid(
                "tester.timeout_secs",
                "must be a positive number of seconds",
            ));
        }
        if self.tester.concurrency == 0 {
            return Err(invalid("tester.concurrency", "must be at least 1"));
        }
        if self.tester.executable_name.trim().is_empty() {
            return Err(invalid("tester.executable_name", "must not be empty"));
        }
        if self.tester.search_dirs.is_empty() {
            return Err(invalid(
                "tester.search_dirs",
                "at least one directory is required",
            ));
        }
        if self.output.path.as_os_str().is_empty() {
            return Err(invalid("output.path", "must not be empty"));
        }
        Ok(())
    }

    /// Serialize to pretty TOML, e.g. for `--print-config` style dumps.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/v2mine/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "v2mine", "v2mine").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> ConfigResult<T> {
    val.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: key.to_string(),
        reason: format!("cannot parse '{val}'"),
    })
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Listing site scraping settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Base URL of the listing site
    pub base_url: String,
    /// Number of index pages to walk, starting at 1
    pub pages: u32,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: f64,
    /// Delay between consecutive HTTP requests in milliseconds
    pub delay_between_requests_ms: u64,
    /// Extra attempts for a failed page before it is skipped
    pub max_retries: u32,
    /// Base delay between retries in milliseconds (multiplied by attempt)
    pub retry_delay_ms: u64,
    /// Whether to follow per-server detail links found on index pages
    pub follow_server_links: bool,
    /// Regex an `href` must match to be treated as a server detail link
    pub server_link_pattern: String,
    /// User agent string
    pub user_agent: String,
}

impl ScrapeConfig {
    /// Request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_secs)
    }

    /// Inter-request delay as a `Duration`.
    #[must_use]
    pub fn delay_between_requests(&self) -> Duration {
        Duration::from_millis(self.delay_between_requests_ms)
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.v2nodes.com".to_string(),
            pages: 5,
            request_timeout_secs: 12.0,
            delay_between_requests_ms: 500,
            max_retries: 1,
            retry_delay_ms: 2000,
            follow_server_links: true,
            server_link_pattern: r"^/servers/\d+/?$".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// How a configuration is handed to the tester executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationMode {
    /// The share link itself replaces `{config}` in the argument template
    Argument,
    /// The share link is written to a temp file whose path replaces `{config}`
    File,
}

/// External tester settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    /// Whether to run the connectivity test at all (`false` keeps every parsed config)
    pub enabled: bool,
    /// File name of the tester executable (platform suffix added automatically)
    pub executable_name: String,
    /// Directories searched in order for the executable
    pub search_dirs: Vec<PathBuf>,
    /// Argument template; `{config}` is replaced per invocation
    pub args: Vec<String>,
    /// How `{config}` is materialized
    pub invocation: InvocationMode,
    /// Per-invocation timeout in seconds
    pub timeout_secs: f64,
    /// Maximum concurrent tester invocations
    pub concurrency: usize,
    /// Optional regex stdout must match (in addition to exit code 0) to pass
    pub pass_pattern: Option<String>,
}

impl TesterConfig {
    /// Subprocess timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            executable_name: "v2ray-tester".to_string(),
            search_dirs: vec![PathBuf::from("vendor"), PathBuf::from("bin")],
            args: vec!["{config}".to_string()],
            invocation: InvocationMode::Argument,
            timeout_secs: 10.0,
            concurrency: 4,
            pass_pattern: None,
        }
    }
}

/// How a run's passing set is combined with the existing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// The list becomes exactly this run's passing set
    #[default]
    Replace,
    /// Prior entries not re-tested in this run are kept after the passing set
    Merge,
}

/// Output list settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the newline-delimited output list
    pub path: PathBuf,
    /// Replace or merge with the existing list
    pub policy: PersistPolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("configs.txt"),
            policy: PersistPolicy::Replace,
        }
    }
}
