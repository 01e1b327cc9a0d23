use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use v2mine_core::{PersistPolicy, RawEntry};
use v2mine_pipeline::{Pipeline, PipelineError};
use v2mine_store::ConfigStore;
use v2mine_tester::{
    ConnectivityTester, PassThroughTester, TestFailure, TestOutcome, TesterError,
};
use v2mine_uri::{DedupKey, ParsedConfig};

/// Passes configurations whose host is in `working_hosts`.
#[derive(Default)]
struct FakeTester {
    working_hosts: HashSet<String>,
    delay: Duration,
    calls: Mutex<HashMap<DedupKey, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTester {
    fn passing(hosts: &[&str]) -> Self {
        Self {
            working_hosts: hosts.iter().map(|h| (*h).to_string()).collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> HashMap<DedupKey, usize> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ConnectivityTester for FakeTester {
    async fn test(
        &self,
        config: &ParsedConfig,
        cancel: &CancellationToken,
    ) -> v2mine_tester::Result<TestOutcome> {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(config.key())
            .or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let cancelled = tokio::select! {
            () = cancel.cancelled() => true,
            () = tokio::time::sleep(self.delay) => false,
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(if cancelled {
            TestOutcome::fail(config.key(), TestFailure::Cancelled)
        } else if self.working_hosts.contains(&config.host) {
            TestOutcome::pass(config.key(), Some(self.delay))
        } else {
            TestOutcome::fail(config.key(), TestFailure::NonZeroExit(Some(1)))
        })
    }
}

/// Fails preparation the way a missing executable does.
struct MissingTester;

#[async_trait]
impl ConnectivityTester for MissingTester {
    async fn prepare(&self) -> v2mine_tester::Result<()> {
        Err(TesterError::ExecutableNotFound {
            name: "v2ray-tester".to_string(),
            searched: vec![PathBuf::from("vendor"), PathBuf::from("bin")],
        })
    }

    async fn test(
        &self,
        _config: &ParsedConfig,
        _cancel: &CancellationToken,
    ) -> v2mine_tester::Result<TestOutcome> {
        panic!("test() called without a tester executable");
    }
}

fn entries(links: &[&str]) -> Vec<RawEntry> {
    links
        .iter()
        .map(|link| RawEntry::new(link).expect("raw entry"))
        .collect()
}

fn read_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read output")
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_full_run_writes_only_working_configs_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("configs.txt");
    let tester = Arc::new(FakeTester::passing(&["good.example", "also-good.example"]));

    let source = entries(&[
        "vless://id-1@good.example:443?type=ws#First",
        "trojan://pw@bad.example:443",
        "vless://id-1@GOOD.example:443?type=grpc#Duplicate",
        "vless://id-1@good.example",
        "ss://YWVzLTI1Ni1nY206eA@also-good.example:8388#SS",
    ]);

    let report = Pipeline::new(tester.clone(), ConfigStore::new(&output))
        .run(source)
        .await
        .expect("run");

    assert_eq!(report.scraped, 5);
    assert_eq!(report.parse_failures, 1);
    assert_eq!(report.unique, 3);
    assert_eq!(report.tested, 3);
    assert_eq!(report.passed(), 2);
    assert!(report.persisted);

    assert_eq!(
        read_lines(&output),
        vec![
            "vless://id-1@good.example:443?type=ws#First",
            "ss://YWVzLTI1Ni1nY206eA@also-good.example:8388#SS",
        ]
    );
    assert!(fs::read_to_string(&output)
        .expect("read output")
        .ends_with('\n'));

    // Every unique configuration is tested exactly once.
    let calls = tester.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.values().all(|&n| n == 1));
}

#[tokio::test]
async fn test_missing_tester_leaves_list_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("configs.txt");
    fs::write(&output, "vless://old@h.example:1\n").expect("seed list");

    let err = Pipeline::new(Arc::new(MissingTester), ConfigStore::new(&output))
        .run(entries(&["vless://new@h.example:1"]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Tester(TesterError::ExecutableNotFound { .. })
    ));
    assert!(err.to_string().contains("vendor, bin"));
    assert_eq!(
        fs::read_to_string(&output).expect("read"),
        "vless://old@h.example:1\n"
    );
}

#[tokio::test]
async fn test_missing_tester_detected_with_nothing_to_test() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("configs.txt");

    let result = Pipeline::new(Arc::new(MissingTester), ConfigStore::new(&output))
        .run(Vec::<RawEntry>::new())
        .await;

    assert!(matches!(result, Err(PipelineError::Tester(_))));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_zero_results_is_success_with_empty_list() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("configs.txt");
    fs::write(&output, "vless://old@h.example:1\n").expect("seed list");

    let report = Pipeline::new(Arc::new(PassThroughTester), ConfigStore::new(&output))
        .run(Vec::<RawEntry>::new())
        .await
        .expect("run");

    assert_eq!(report.passed(), 0);
    assert_eq!(fs::read_to_string(&output).expect("read"), "");
}

#[tokio::test]
async fn test_concurrency_limit_is_respected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tester = Arc::new(FakeTester {
        delay: Duration::from_millis(50),
        ..FakeTester::default()
    });

    let links: Vec<String> = (1..=10)
        .map(|n| format!("vless://id@host-{n}.example:443"))
        .collect();
    let links: Vec<&str> = links.iter().map(String::as_str).collect();

    let report = Pipeline::new(
        tester.clone(),
        ConfigStore::new(dir.path().join("configs.txt")),
    )
    .with_concurrency(3)
    .run(entries(&links))
    .await
    .expect("run");

    assert_eq!(report.tested, 10);
    let max = tester.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "{max} tests were in flight");
    assert!(max >= 2, "tests never overlapped");
}

#[tokio::test]
async fn test_merge_keeps_untested_prior_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("configs.txt");
    fs::write(
        &output,
        "trojan://pw@flaky.example:443\nvless://id@untested.example:443#kept\n",
    )
    .expect("seed list");

    let tester = Arc::new(FakeTester::passing(&["fresh.example"]));
    let report = Pipeline::new(tester, ConfigStore::new(&output))
        .with_policy(PersistPolicy::Merge)
        .run(entries(&[
            "vless://id@fresh.example:443",
            "trojan://pw@flaky.example:443",
        ]))
        .await
        .expect("run");

    assert_eq!(report.passed(), 1);
    assert_eq!(
        read_lines(&output),
        vec![
            "vless://id@fresh.example:443",
            "vless://id@untested.example:443#kept",
        ]
    );
}

#[tokio::test]
async fn test_cancellation_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("configs.txt");
    fs::write(&output, "vless://old@h.example:1\n").expect("seed list");

    let tester = Arc::new(FakeTester {
        delay: Duration::from_secs(30),
        ..FakeTester::passing(&["h.example"])
    });
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = Pipeline::new(tester, ConfigStore::new(&output))
        .with_cancellation(cancel)
        .run(entries(&["vless://a@h.example:1", "vless://b@h.example:1"]))
        .await;

    assert!(matches!(result, Err(PipelineError::Cancelled)));
    assert_eq!(
        fs::read_to_string(&output).expect("read"),
        "vless://old@h.example:1\n"
    );
}

#[tokio::test]
async fn test_dry_run_does_not_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("configs.txt");

    let report = Pipeline::new(Arc::new(PassThroughTester), ConfigStore::new(&output))
        .with_dry_run(true)
        .run(entries(&["vless://a@h.example:1"]))
        .await
        .expect("run");

    assert!(!report.persisted);
    assert_eq!(report.output, vec!["vless://a@h.example:1".to_string()]);
    assert!(!output.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_subprocess_exit_one_is_absent_from_list() {
    use std::os::unix::fs::PermissionsExt;
    use v2mine_core::TesterConfig;
    use v2mine_tester::SubprocessTester;

    let dir = tempfile::tempdir().expect("tempdir");
    let vendor = dir.path().join("vendor");
    fs::create_dir(&vendor).expect("mkdir vendor");
    let script = vendor.join("v2ray-tester");
    fs::write(
        &script,
        "#!/bin/sh\ncase \"$1\" in\n  *good.example*) exit 0 ;;\nesac\nexit 1\n",
    )
    .expect("write script");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");

    let tester = SubprocessTester::new(&TesterConfig {
        search_dirs: vec![vendor, dir.path().join("bin")],
        ..TesterConfig::default()
    })
    .expect("tester");

    let output = dir.path().join("configs.txt");
    let report = Pipeline::new(Arc::new(tester), ConfigStore::new(&output))
        .run(entries(&[
            "vless://id@good.example:443?security=tls",
            "trojan://pw@bad.example:443",
        ]))
        .await
        .expect("run");

    assert_eq!(report.tested, 2);
    assert_eq!(
        read_lines(&output),
        vec!["vless://id@good.example:443?security=tls"]
    );
}
