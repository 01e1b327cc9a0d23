//! Pipeline orchestrator driving one run through every stage.

use crate::dedupe::dedupe;
use crate::error::{PipelineError, Result};
use crate::filter::{filter_working, merge_with_prior};
use crate::report::RunReport;
use crate::source::EntrySource;
use crate::stage::{RunStage, StageTracker};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use v2mine_core::types::preview;
use v2mine_core::{AppConfig, PersistPolicy, RawEntry, Timestamp};
use v2mine_store::ConfigStore;
use v2mine_tester::{ConnectivityTester, TestOutcome};
use v2mine_uri::{DedupKey, ParsedConfig};

/// Default number of tester invocations in flight.
const DEFAULT_CONCURRENCY: usize = 4;

/// Runs scrape → parse → dedupe → test → filter → persist.
pub struct Pipeline {
    tester: Arc<dyn ConnectivityTester>,
    store: ConfigStore,
    policy: PersistPolicy,
    concurrency: usize,
    dry_run: bool,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Create a pipeline writing to `store` with the default settings.
    #[must_use]
    pub fn new(tester: Arc<dyn ConnectivityTester>, store: ConfigStore) -> Self {
        Self {
            tester,
            store,
            policy: PersistPolicy::Replace,
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
            cancel: CancellationToken::new(),
        }
    }

    /// Create a pipeline from the application configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig, tester: Arc<dyn ConnectivityTester>) -> Self {
        Self::new(tester, ConfigStore::new(&config.output.path))
            .with_policy(config.output.policy)
            .with_concurrency(config.tester.concurrency)
    }

    /// Set how the passing set is combined with the existing list.
    #[must_use]
    pub fn with_policy(mut self, policy: PersistPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the maximum number of tester invocations in flight (at least 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Compute the resulting list without writing it.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Use `cancel` to stop the run early.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Execute one run.
    ///
    /// Returns an error, leaving the existing list untouched, when the
    /// tester cannot run, the list cannot be written, or the run is
    /// cancelled. Everything else is counted in the report.
    pub async fn run<S: EntrySource>(&self, source: S) -> Result<RunReport> {
        let mut tracker = StageTracker::new();
        let mut report = RunReport::new();

        match self.execute(source, &mut tracker, &mut report).await {
            Ok(()) => {
                report.final_stage = tracker.current();
                report.finished_at = Timestamp::now();
                tracing::info!(summary = %report, "Run finished");
                Ok(report)
            }
            Err(e) => {
                let failed_in = tracker.current();
                tracker.fail();
                match &e {
                    PipelineError::Cancelled => {
                        tracing::warn!(stage = %failed_in, "Run cancelled, nothing written");
                    }
                    other => tracing::error!(stage = %failed_in, error = %other, "Run failed"),
                }
                Err(e)
            }
        }
    }

    async fn execute<S: EntrySource>(
        &self,
        source: S,
        tracker: &mut StageTracker,
        report: &mut RunReport,
    ) -> Result<()> {
        tracker.advance();
        let entries = self.scrape(source).await;
        report.scraped = entries.len();
        self.check_cancelled()?;

        tracker.advance();
        let (parsed, failures) = parse_entries(entries);
        report.parse_failures = failures;

        tracker.advance();
        let unique = dedupe(parsed);
        report.unique = unique.len();
        tracing::info!(
            scraped = report.scraped,
            unparseable = report.parse_failures,
            unique = report.unique,
            "Collected configurations"
        );
        self.check_cancelled()?;

        tracker.advance();
        self.tester.prepare().await?;
        let outcomes = self.test_all(&unique).await?;
        report.tested = outcomes.len();
        self.check_cancelled()?;

        tracker.advance();
        report.working = filter_working(&unique, &outcomes);

        tracker.advance();
        report.output = match self.policy {
            PersistPolicy::Replace => report.working.iter().map(|w| w.uri().to_string()).collect(),
            PersistPolicy::Merge => {
                let tested: HashSet<DedupKey> = outcomes.into_iter().map(|o| o.key).collect();
                merge_with_prior(&report.working, self.store.load()?, &tested)
            }
        };
        if self.dry_run {
            tracing::info!(count = report.output.len(), "Dry run, list not written");
        } else {
            self.store.save(&report.output)?;
            report.persisted = true;
        }

        tracker.advance();
        debug_assert_eq!(tracker.current(), RunStage::Done);
        Ok(())
    }

    async fn scrape<S: EntrySource>(&self, source: S) -> Vec<RawEntry> {
        let entries: Vec<RawEntry> = source.into_entries(self.cancel.clone()).collect().await;
        tracing::debug!(count = entries.len(), "Scraped entries");
        entries
    }

    /// Test every configuration with at most `concurrency` in flight.
    /// Outcomes are returned in completion order.
    async fn test_all(&self, configs: &[ParsedConfig]) -> Result<Vec<TestOutcome>> {
        let mut outcomes = Vec::with_capacity(configs.len());
        let mut pending = configs.iter();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < self.concurrency {
                match pending.next() {
                    Some(config) => in_flight.push(self.tester.test(config, &self.cancel)),
                    None => break,
                }
            }

            let Some(result) = in_flight.next().await else {
                break;
            };
            let outcome = result?;
            match &outcome.failure {
                None => tracing::debug!(config = %outcome.key, latency = ?outcome.latency, "Working"),
                Some(failure) => {
                    tracing::debug!(config = %outcome.key, reason = %failure, "Not working");
                }
            }
            outcomes.push(outcome);
        }

        let passed = outcomes.iter().filter(|o| o.passed).count();
        tracing::info!(
            tested = outcomes.len(),
            passed,
            failed = outcomes.len() - passed,
            "Testing finished"
        );
        Ok(outcomes)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Parse every entry, logging and counting the ones that fail.
fn parse_entries(entries: Vec<RawEntry>) -> (Vec<ParsedConfig>, usize) {
    let mut parsed = Vec::with_capacity(entries.len());
    let mut failures = 0;

    for entry in entries {
        match v2mine_uri::parse(&entry) {
            Ok(config) => parsed.push(config),
            Err(e) => {
                failures += 1;
                tracing::warn!(entry = %preview(entry.as_str()), error = %e, "Discarding entry");
            }
        }
    }

    (parsed, failures)
}
