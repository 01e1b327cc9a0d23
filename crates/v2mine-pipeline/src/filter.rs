//! Selecting working configurations and combining them with the prior list.

use std::collections::{HashMap, HashSet};
use std::time::Duration;
use v2mine_tester::TestOutcome;
use v2mine_uri::{DedupKey, ParsedConfig};

/// A configuration whose test passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingConfig {
    /// The parsed configuration; [`ParsedConfig::raw`] is what gets stored
    pub config: ParsedConfig,
    /// Tester wall-clock time, when measured
    pub latency: Option<Duration>,
}

impl WorkingConfig {
    /// The link text written to the output list.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.config.raw
    }
}

/// Configurations whose outcome passed, in the order of `configs`, each at
/// most once. Configurations without an outcome are dropped.
#[must_use]
pub fn filter_working(configs: &[ParsedConfig], outcomes: &[TestOutcome]) -> Vec<WorkingConfig> {
    let by_key: HashMap<&DedupKey, &TestOutcome> =
        outcomes.iter().map(|outcome| (&outcome.key, outcome)).collect();
    let mut emitted = HashSet::new();

    configs
        .iter()
        .filter_map(|config| {
            let key = config.key();
            let outcome = by_key.get(&key)?;
            if !outcome.passed || !emitted.insert(key) {
                return None;
            }
            Some(WorkingConfig {
                config: config.clone(),
                latency: outcome.latency,
            })
        })
        .collect()
}

/// The merged list: this run's passing links, followed by prior links whose
/// configuration was not tested in this run. Prior links that were re-tested
/// are either already in `passing` or failed, so they are dropped either way.
/// Prior lines that no longer parse are dropped too.
#[must_use]
pub fn merge_with_prior(
    passing: &[WorkingConfig],
    prior: Vec<String>,
    tested: &HashSet<DedupKey>,
) -> Vec<String> {
    let mut seen: HashSet<DedupKey> = passing.iter().map(|w| w.config.key()).collect();
    let mut merged: Vec<String> = passing.iter().map(|w| w.uri().to_string()).collect();

    for line in prior {
        match v2mine_uri::parse_str(&line) {
            Ok(config) => {
                let key = config.key();
                if !tested.contains(&key) && seen.insert(key) {
                    merged.push(line);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unparseable line from existing list");
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use v2mine_tester::TestFailure;
    use v2mine_uri::parse_str;

    fn configs(links: &[&str]) -> Vec<ParsedConfig> {
        links.iter().map(|l| parse_str(l).expect("parse")).collect()
    }

    #[test]
    fn test_keeps_passing_in_order_once() {
        let configs = configs(&[
            "vless://a@h.example:1",
            "vless://b@h.example:1",
            "vless://c@h.example:1",
        ]);
        // Outcomes arrive in completion order, not input order.
        let outcomes = vec![
            TestOutcome::pass(configs[2].key(), None),
            TestOutcome::fail(configs[1].key(), TestFailure::Timeout),
            TestOutcome::pass(configs[0].key(), Some(Duration::from_millis(5))),
        ];

        let working = filter_working(&configs, &outcomes);
        let uris: Vec<_> = working.iter().map(WorkingConfig::uri).collect();
        assert_eq!(uris, vec!["vless://a@h.example:1", "vless://c@h.example:1"]);
        assert_eq!(working[0].latency, Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_duplicate_input_emitted_once() {
        let configs = configs(&["vless://a@h.example:1", "vless://a@h.example:1#again"]);
        let outcomes = vec![TestOutcome::pass(configs[0].key(), None)];

        let working = filter_working(&configs, &outcomes);
        assert_eq!(working.len(), 1);
        assert_eq!(working[0].uri(), "vless://a@h.example:1");
    }

    #[test]
    fn test_merge_policy() {
        let current = configs(&["vless://new@h.example:1", "vless://again@h.example:1"]);
        let passing: Vec<WorkingConfig> = current
            .iter()
            .map(|config| WorkingConfig {
                config: config.clone(),
                latency: None,
            })
            .collect();
        let failed = parse_str("trojan://gone@h.example:2").expect("parse");

        let mut tested: HashSet<DedupKey> = current.iter().map(ParsedConfig::key).collect();
        tested.insert(failed.key());

        let prior = vec![
            "vless://again@h.example:1#old-name".to_string(),
            "trojan://gone@h.example:2".to_string(),
            "ss://YWVzLTI1Ni1nY206eA@keep.example:8388".to_string(),
            "garbage line".to_string(),
        ];

        let merged = merge_with_prior(&passing, prior, &tested);
        assert_eq!(
            merged,
            vec![
                "vless://new@h.example:1".to_string(),
                "vless://again@h.example:1".to_string(),
                "ss://YWVzLTI1Ni1nY206eA@keep.example:8388".to_string(),
            ]
        );
    }
}
