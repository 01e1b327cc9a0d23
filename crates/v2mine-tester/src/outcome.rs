//! Per-configuration test results.

use std::fmt;
use std::time::Duration;
use v2mine_uri::DedupKey;

/// Why a configuration did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestFailure {
    /// The tester did not finish within the configured timeout
    Timeout,
    /// The tester exited unsuccessfully; `None` when killed by a signal
    NonZeroExit(Option<i32>),
    /// Exit code 0, but stdout did not match the pass pattern
    UnexpectedOutput,
    /// The process could not be started
    Spawn(String),
    /// Preparing the input or waiting on the process failed
    Io(String),
    /// The run was cancelled while this configuration was in flight
    Cancelled,
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::NonZeroExit(Some(code)) => write!(f, "exited with code {code}"),
            Self::NonZeroExit(None) => write!(f, "terminated by signal"),
            Self::UnexpectedOutput => write!(f, "output did not match pass pattern"),
            Self::Spawn(msg) => write!(f, "failed to start: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of testing one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    /// Which configuration was tested
    pub key: DedupKey,
    /// Whether the configuration is working
    pub passed: bool,
    /// Wall-clock time of the tester invocation, for passing configs
    pub latency: Option<Duration>,
    /// Reason for failing configs
    pub failure: Option<TestFailure>,
}

impl TestOutcome {
    /// A passing outcome.
    #[must_use]
    pub fn pass(key: DedupKey, latency: Option<Duration>) -> Self {
        Self {
            key,
            passed: true,
            latency,
            failure: None,
        }
    }

    /// A failing outcome.
    #[must_use]
    pub fn fail(key: DedupKey, failure: TestFailure) -> Self {
        Self {
            key,
            passed: false,
            latency: None,
            failure: Some(failure),
        }
    }
}
