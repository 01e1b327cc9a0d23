//! The v2mine run pipeline.
//!
//! A run moves strictly forward through
//! `START → SCRAPING → PARSING → DEDUPING → TESTING → FILTERING → PERSISTING → DONE`.
//! Problems with individual pages, entries or configurations are logged and
//! counted in the [`RunReport`]; only a missing tester, a failed write or
//! cancellation end a run in the `ERROR` stage, and in every such case the
//! existing output list is left as it was.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use v2mine_core::AppConfig;
//! use v2mine_pipeline::Pipeline;
//! use v2mine_scraper::Scraper;
//! use v2mine_tester::SubprocessTester;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let tester = Arc::new(SubprocessTester::new(&config.tester)?);
//! let report = Pipeline::from_config(&config, tester)
//!     .run(Scraper::new(&config.scrape)?)
//!     .await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod dedupe;
#[allow(missing_docs)]
pub mod error;
pub mod filter;
pub mod orchestrator;
pub mod report;
pub mod source;
pub mod stage;

pub use dedupe::dedupe;
pub use error::{PipelineError, Result};
pub use filter::{filter_working, merge_with_prior, WorkingConfig};
pub use orchestrator::Pipeline;
pub use report::RunReport;
pub use source::EntrySource;
pub use stage::{RunStage, StageTracker};
