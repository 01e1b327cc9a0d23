//! [`ConnectivityTester`] backed by the external tester executable.

use crate::error::{Result, TesterError};
use crate::outcome::{TestFailure, TestOutcome};
use crate::resolve::resolve_executable;
use crate::ConnectivityTester;
use async_trait::async_trait;
use regex::Regex;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use v2mine_core::{InvocationMode, TesterConfig};
use v2mine_uri::ParsedConfig;

/// Placeholder in the argument template replaced by the configuration.
pub const CONFIG_PLACEHOLDER: &str = "{config}";

/// How long to wait for output pipes after the process has exited.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// Runs the tester executable once per configuration.
///
/// The executable is located on first use and cached for the lifetime of
/// the tester.
pub struct SubprocessTester {
    executable_name: String,
    search_dirs: Vec<PathBuf>,
    args: Vec<String>,
    invocation: InvocationMode,
    timeout: Duration,
    pass_pattern: Option<Regex>,
    executable: OnceCell<PathBuf>,
}

enum Waited {
    Exited(io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

impl SubprocessTester {
    /// Build a tester from configuration. Fails only on an invalid
    /// `pass_pattern`.
    pub fn new(config: &TesterConfig) -> Result<Self> {
        let pass_pattern = config
            .pass_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| TesterError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            executable_name: config.executable_name.clone(),
            search_dirs: config.search_dirs.clone(),
            args: config.args.clone(),
            invocation: config.invocation,
            timeout: config.timeout(),
            pass_pattern,
            executable: OnceCell::new(),
        })
    }

    async fn executable(&self) -> Result<&PathBuf> {
        self.executable
            .get_or_try_init(|| async {
                resolve_executable(&self.executable_name, &self.search_dirs)
            })
            .await
    }

    fn command_args(&self, value: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(CONFIG_PLACEHOLDER, value))
            .collect()
    }

    fn interpret(&self, status: ExitStatus, stdout: &str) -> std::result::Result<(), TestFailure> {
        if !status.success() {
            return Err(TestFailure::NonZeroExit(status.code()));
        }
        match &self.pass_pattern {
            Some(pattern) if !pattern.is_match(stdout) => Err(TestFailure::UnexpectedOutput),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ConnectivityTester for SubprocessTester {
    async fn prepare(&self) -> Result<()> {
        let path = self.executable().await?;
        tracing::info!(path = %path.display(), "Using tester executable");
        Ok(())
    }

    async fn test(
        &self,
        config: &ParsedConfig,
        cancel: &CancellationToken,
    ) -> Result<TestOutcome> {
        let key = config.key();
        let executable = self.executable().await?.clone();

        if cancel.is_cancelled() {
            return Ok(TestOutcome::fail(key, TestFailure::Cancelled));
        }

        let uri = config.to_uri();
        // Held until the process has exited; dropping it removes the file.
        let mut input_file = None;
        let value = match self.invocation {
            InvocationMode::Argument => uri,
            InvocationMode::File => match write_input_file(&uri) {
                Ok(file) => {
                    let path = file.path().display().to_string();
                    input_file = Some(file);
                    path
                }
                Err(e) => return Ok(TestOutcome::fail(key, TestFailure::Io(e.to_string()))),
            },
        };

        let mut command = Command::new(&executable);
        command
            .args(self.command_args(&value))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(config = %key, error = %e, "Failed to start tester");
                return Ok(TestOutcome::fail(key, TestFailure::Spawn(e.to_string())));
            }
        };
        // Anything the tester started is killed with it, however this returns.
        let group = ProcessGroup(child.id());

        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        let waited = tokio::select! {
            () = cancel.cancelled() => Waited::Cancelled,
            result = tokio::time::timeout(self.timeout, child.wait()) => match result {
                Ok(status) => Waited::Exited(status),
                Err(_) => Waited::TimedOut,
            },
        };

        let status = match waited {
            Waited::Exited(Ok(status)) => status,
            Waited::Exited(Err(e)) => {
                terminate(&mut child, &group, stdout_task, stderr_task).await;
                return Ok(TestOutcome::fail(key, TestFailure::Io(e.to_string())));
            }
            Waited::TimedOut => {
                terminate(&mut child, &group, stdout_task, stderr_task).await;
                tracing::debug!(config = %key, timeout = ?self.timeout, "Tester timed out");
                return Ok(TestOutcome::fail(key, TestFailure::Timeout));
            }
            Waited::Cancelled => {
                terminate(&mut child, &group, stdout_task, stderr_task).await;
                return Ok(TestOutcome::fail(key, TestFailure::Cancelled));
            }
        };
        let latency = started.elapsed();
        group.kill();
        drop(input_file);

        let stdout = collect(stdout_task).await;
        let stderr = collect(stderr_task).await;
        tracing::debug!(
            config = %key,
            status = %status,
            stdout = %stdout.trim(),
            stderr = %stderr.trim(),
            "Tester finished"
        );

        Ok(match self.interpret(status, &stdout) {
            Ok(()) => TestOutcome::pass(key, Some(latency)),
            Err(failure) => TestOutcome::fail(key, failure),
        })
    }
}

fn write_input_file(uri: &str) -> io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("v2mine-")
        .suffix(".txt")
        .tempfile()?;
    writeln!(file, "{uri}")?;
    file.flush()?;
    Ok(file)
}

fn drain<R>(reader: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut reader) = reader {
            if let Err(e) = reader.read_to_end(&mut buf).await {
                tracing::trace!(error = %e, "Error reading tester output");
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

async fn collect(task: JoinHandle<String>) -> String {
    match tokio::time::timeout(OUTPUT_GRACE, task).await {
        Ok(Ok(output)) => output,
        Ok(Err(_)) => String::new(),
        Err(_) => {
            tracing::debug!("Tester output still open after exit, ignoring it");
            String::new()
        }
    }
}

/// Process group led by the tester child. Dropping it kills every process
/// left in the group.
#[cfg_attr(not(unix), allow(dead_code))]
struct ProcessGroup(Option<u32>);

impl ProcessGroup {
    #[cfg(unix)]
    fn kill(&self) {
        let Some(pgid) = self.0.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
            return;
        };
        // SAFETY: killpg takes no pointers; the group was created for this child.
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
            let e = io::Error::last_os_error();
            if e.raw_os_error() != Some(libc::ESRCH) {
                tracing::debug!(pgid, error = %e, "Failed to kill tester process group");
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Kill the child and its process group, reap the child, then stop
/// reading its output.
async fn terminate(
    child: &mut Child,
    group: &ProcessGroup,
    stdout: JoinHandle<String>,
    stderr: JoinHandle<String>,
) {
    group.kill();
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "Failed to kill tester process");
    }
    stdout.abort();
    stderr.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester_config(dir: PathBuf) -> TesterConfig {
        TesterConfig {
            executable_name: "fake-tester".to_string(),
            search_dirs: vec![dir],
            args: vec!["--ping".to_string(), CONFIG_PLACEHOLDER.to_string()],
            ..TesterConfig::default()
        }
    }

    #[test]
    fn test_invalid_pass_pattern() {
        let config = TesterConfig {
            pass_pattern: Some("(unclosed".to_string()),
            ..TesterConfig::default()
        };
        let err = SubprocessTester::new(&config).err().expect("invalid pattern");
        assert!(matches!(err, TesterError::InvalidPattern { .. }));
    }

    #[test]
    fn test_command_args_substitutes_placeholder() {
        let tester = SubprocessTester::new(&tester_config(PathBuf::from("bin"))).expect("tester");
        assert_eq!(
            tester.command_args("vless://id@h:1"),
            vec!["--ping".to_string(), "vless://id@h:1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_prepare_fails_without_executable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tester =
            SubprocessTester::new(&tester_config(dir.path().to_path_buf())).expect("tester");

        let err = tester.prepare().await.unwrap_err();
        assert!(matches!(err, TesterError::ExecutableNotFound { .. }));
    }
}
