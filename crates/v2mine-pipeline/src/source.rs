//! Where a run's raw entries come from.

use futures::stream::{self, BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;
use v2mine_core::RawEntry;
use v2mine_scraper::Scraper;

/// A one-shot supply of scraped entries.
pub trait EntrySource: Send {
    /// Turn the source into a finite stream. The stream should end early
    /// once `cancel` fires.
    fn into_entries(self, cancel: CancellationToken) -> BoxStream<'static, RawEntry>;
}

impl EntrySource for Scraper {
    fn into_entries(self, cancel: CancellationToken) -> BoxStream<'static, RawEntry> {
        self.into_stream(cancel)
    }
}

/// A fixed list, e.g. links read from a file or built in tests.
impl EntrySource for Vec<RawEntry> {
    fn into_entries(self, _cancel: CancellationToken) -> BoxStream<'static, RawEntry> {
        stream::iter(self).boxed()
    }
}
