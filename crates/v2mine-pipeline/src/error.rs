use thiserror::Error;
use v2mine_store::StoreError;
use v2mine_tester::TesterError;

/// Conditions that end a run in the error stage. Per-entry problems (bad
/// pages, unparseable links, failing configurations) never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Tester(#[from] TesterError),

    #[error("Failed to persist working configurations: {0}")]
    Store(#[from] StoreError),

    #[error("Run cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
