//! v2mine Core - Foundation crate for the v2mine config harvester.
//!
//! This crate provides the shared types, error handling and configuration
//! management that the scraper, parser, tester and pipeline crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes and enums (`Scheme`, `RawEntry`, `Timestamp`)
//!
//! # Example
//!
//! ```rust
//! use v2mine_core::{AppConfig, RawEntry, Scheme};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! config.validate()?;
//!
//! let entry = RawEntry::new("vless://id@example.com:443?type=ws")?;
//! assert_eq!(entry.scheme(), Scheme::Vless);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, InvocationMode, OutputConfig, PersistPolicy, ScrapeConfig, TesterConfig,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use types::{RawEntry, Scheme, Timestamp};
