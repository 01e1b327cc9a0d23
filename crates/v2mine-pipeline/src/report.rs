//! Summary of a finished run.

use crate::filter::WorkingConfig;
use crate::stage::RunStage;
use std::fmt;
use v2mine_core::Timestamp;

/// Counts per stage plus the working set of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// When the run started
    pub started_at: Timestamp,
    /// When the run reached its final stage
    pub finished_at: Timestamp,
    /// Stage the run ended in
    pub final_stage: RunStage,
    /// Entries produced by the source
    pub scraped: usize,
    /// Entries the parser rejected
    pub parse_failures: usize,
    /// Configurations left after deduplication
    pub unique: usize,
    /// Configurations handed to the tester
    pub tested: usize,
    /// Configurations that passed, in dedup order
    pub working: Vec<WorkingConfig>,
    /// Lines of the resulting list (after the persist policy is applied)
    pub output: Vec<String>,
    /// Whether the list file was written
    pub persisted: bool,
}

impl RunReport {
    pub(crate) fn new() -> Self {
        let now = Timestamp::now();
        Self {
            started_at: now,
            finished_at: now,
            final_stage: RunStage::Start,
            scraped: 0,
            parse_failures: 0,
            unique: 0,
            tested: 0,
            working: Vec::new(),
            output: Vec::new(),
            persisted: false,
        }
    }

    /// Number of working configurations.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.working.len()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scraped {}, unparseable {}, unique {}, tested {}, working {}, written {}",
            self.scraped,
            self.parse_failures,
            self.unique,
            self.tested,
            self.passed(),
            if self.persisted {
                self.output.len().to_string()
            } else {
                "none".to_string()
            }
        )
    }
}
