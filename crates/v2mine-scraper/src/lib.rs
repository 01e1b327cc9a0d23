//! Listing-site scraper for v2mine.
//!
//! Walks the paginated index of the listing site (`{base_url}/?page=N`),
//! optionally follows the per-server detail links found there, and yields
//! every share link it finds as a [`RawEntry`] stream.
//!
//! Requests are strictly sequential with a polite delay between them. A page
//! that fails (timeout, transport error, non-success status) is logged and
//! skipped; it never aborts the crawl.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
#[allow(missing_docs)]
pub mod error;
pub mod extract;

pub use client::PageClient;
pub use error::{Result, ScrapeError};
pub use extract::{extract_uris, server_links};

use futures::stream::{self, BoxStream, StreamExt};
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use tokio_util::sync::CancellationToken;
use url::Url;
use v2mine_core::{RawEntry, ScrapeConfig};

/// Scraper for one run. Consumed by [`Scraper::into_stream`].
pub struct Scraper {
    client: PageClient,
    base_url: Url,
    pages: u32,
    follow_server_links: bool,
    link_pattern: Regex,
}

impl Scraper {
    /// Build a scraper from the scrape settings.
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let base_url =
            Url::parse(config.base_url.trim()).map_err(|source| ScrapeError::InvalidBaseUrl {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(Self {
            client: PageClient::new(config)?,
            base_url,
            pages: config.pages,
            follow_server_links: config.follow_server_links,
            link_pattern: Regex::new(&config.server_link_pattern)?,
        })
    }

    /// URL of index page `page` (1-based).
    #[must_use]
    pub fn index_url(&self, page: u32) -> Url {
        index_url(&self.base_url, page)
    }

    /// Lazily crawl the site. Nothing is fetched until the stream is polled,
    /// and the stream ends early once `cancel` fires.
    #[must_use]
    pub fn into_stream(self, cancel: CancellationToken) -> BoxStream<'static, RawEntry> {
        let crawl = Crawl {
            scraper: self,
            cancel,
            next_page: 1,
            details: VecDeque::new(),
            seen_details: HashSet::new(),
            pending: VecDeque::new(),
            entries_found: 0,
            pages_failed: 0,
        };

        stream::unfold(crawl, |mut crawl| async move {
            loop {
                if let Some(entry) = crawl.pending.pop_front() {
                    return Some((entry, crawl));
                }
                if crawl.cancel.is_cancelled() {
                    return None;
                }
                let (url, is_index) = crawl.next_target()?;
                if !crawl.visit(url, is_index).await {
                    return None;
                }
            }
        })
        .boxed()
    }
}

/// `{base}/?page={page}`, replacing any query already on `base`.
#[must_use]
pub fn index_url(base: &Url, page: u32) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("page", &page.to_string());
    url
}

struct Crawl {
    scraper: Scraper,
    cancel: CancellationToken,
    next_page: u32,
    details: VecDeque<Url>,
    seen_details: HashSet<String>,
    pending: VecDeque<RawEntry>,
    entries_found: usize,
    pages_failed: usize,
}

impl Crawl {
    /// Detail pages of the current index page come before the next index page.
    fn next_target(&mut self) -> Option<(Url, bool)> {
        if let Some(url) = self.details.pop_front() {
            return Some((url, false));
        }
        if self.next_page <= self.scraper.pages {
            let url = self.scraper.index_url(self.next_page);
            self.next_page += 1;
            return Some((url, true));
        }

        tracing::info!(
            entries = self.entries_found,
            requests = self.scraper.client.requests_made(),
            failed_pages = self.pages_failed,
            "Scraping finished"
        );
        None
    }

    /// Returns `false` once the crawl was cancelled.
    async fn visit(&mut self, url: Url, is_index: bool) -> bool {
        let body = match self.scraper.client.fetch(&url, &self.cancel).await {
            Ok(body) => body,
            Err(ScrapeError::Cancelled) => {
                tracing::info!(url = %url, "Scraping cancelled");
                return false;
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Skipping page");
                self.pages_failed += 1;
                return true;
            }
        };

        let entries = extract_uris(&body);
        tracing::debug!(url = %url, count = entries.len(), "Extracted share links");
        self.entries_found += entries.len();
        self.pending.extend(entries);

        if is_index && self.scraper.follow_server_links {
            for link in server_links(&body, &url, &self.scraper.link_pattern) {
                if self.seen_details.insert(link.as_str().to_string()) {
                    self.details.push_back(link);
                }
            }
        }
        true
    }
}
