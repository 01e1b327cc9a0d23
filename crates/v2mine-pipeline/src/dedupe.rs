//! Collapsing configurations that point at the same server and account.

use std::collections::HashSet;
use v2mine_uri::ParsedConfig;

/// Keep the first configuration for every [`v2mine_uri::DedupKey`],
/// preserving first-seen order. Applying it twice changes nothing.
#[must_use]
pub fn dedupe(configs: Vec<ParsedConfig>) -> Vec<ParsedConfig> {
    let mut seen = HashSet::with_capacity(configs.len());
    configs
        .into_iter()
        .filter(|config| seen.insert(config.key()))
        .collect()
}
