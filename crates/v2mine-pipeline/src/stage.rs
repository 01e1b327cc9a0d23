//! Run stages and the transitions allowed between them.

use std::fmt;

/// Where a run currently is. Runs move strictly forward through the
/// happy path; [`RunStage::Error`] and [`RunStage::Done`] are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum RunStage {
    Start,
    Scraping,
    Parsing,
    Deduping,
    Testing,
    Filtering,
    Persisting,
    Done,
    Error,
}

impl RunStage {
    /// The next stage on the happy path, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::Scraping),
            Self::Scraping => Some(Self::Parsing),
            Self::Parsing => Some(Self::Deduping),
            Self::Deduping => Some(Self::Testing),
            Self::Testing => Some(Self::Filtering),
            Self::Filtering => Some(Self::Persisting),
            Self::Persisting => Some(Self::Done),
            Self::Done | Self::Error => None,
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Whether `self -> to` is a legal transition. Any non-terminal stage
    /// may fall into `Error`.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        if to == Self::Error {
            return !self.is_terminal();
        }
        self.next() == Some(to)
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::Scraping => "SCRAPING",
            Self::Parsing => "PARSING",
            Self::Deduping => "DEDUPING",
            Self::Testing => "TESTING",
            Self::Filtering => "FILTERING",
            Self::Persisting => "PERSISTING",
            Self::Done => "DONE",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Tracks the stage of one run and logs every transition.
#[derive(Debug)]
pub struct StageTracker {
    current: RunStage,
    history: Vec<RunStage>,
}

impl StageTracker {
    /// A tracker in [`RunStage::Start`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RunStage::Start,
            history: vec![RunStage::Start],
        }
    }

    /// Current stage.
    #[must_use]
    pub fn current(&self) -> RunStage {
        self.current
    }

    /// Every stage visited so far, in order.
    #[must_use]
    pub fn history(&self) -> &[RunStage] {
        &self.history
    }

    /// Move to the next happy-path stage.
    ///
    /// # Panics
    /// Panics when called from a terminal stage; the orchestrator never
    /// does so.
    pub fn advance(&mut self) -> RunStage {
        let next = self
            .current
            .next()
            .unwrap_or_else(|| panic!("no stage after {}", self.current));
        self.enter(next);
        next
    }

    /// Move to [`RunStage::Error`]. No-op when already terminal.
    pub fn fail(&mut self) {
        if self.current.can_transition_to(RunStage::Error) {
            self.enter(RunStage::Error);
        }
    }

    fn enter(&mut self, stage: RunStage) {
        tracing::debug!(from = %self.current, to = %stage, "Stage transition");
        self.current = stage;
        self.history.push(stage);
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
