//! Child process spawn, bounded output capture, and timeout/kill.
//!
//! Grounded on the teacher's `core/src/exec.rs`
//! (`spawn_child_async`/`consume_truncated_output`/`read_capped`): the same
//! "redirect piped stdio, drain both streams concurrently, race the child
//! against a deadline" shape, generalized from a sandboxed shell-tool call
//! (seatbelt/seccomp, a combined byte+line budget sized for an LLM context
//! window) to a whitelisted administrative command (no sandbox layer, a
//! strict per-stream byte cap per spec §3/§4.4, and a process-group kill so
//! a forked grandchild cannot outlive its parent's timeout).

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::Command;

use beacon_protocol::CommandResponse;

/// What the OS actually did, before it is folded into a `CommandResponse`.
pub enum Outcome {
    Exited { exit_code: i32, stdout: Vec<u8>, stderr: Vec<u8> },
    TimedOut { stdout: Vec<u8>, stderr: Vec<u8> },
    NotFound,
    SpawnFailed(String),
}

pub struct RunParams {
    pub command: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub timeout: Duration,
    pub max_output: usize,
}

/// Spawns `command` with `args` as a literal argv (no shell), drains both
/// pipes up to `max_output` bytes each, and races the child against
/// `timeout`. Returns wall time from spawn attempt to completion alongside
/// the outcome; callers fold this into `CommandResponse::duration_ms`.
pub async fn run(params: RunParams) -> (Outcome, Duration) {
    let start = Instant::now();
    let mut cmd = Command::new(&params.command);
    cmd.args(&params.args);
    if let Some(workdir) = &params.workdir {
        cmd.current_dir(workdir);
    }
    for (key, value) in &params.env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Put the child in its own process group so a timeout can kill the
        // whole subtree, not just the direct child. See spec §9 "Process
        // management".
        cmd.process_group(0);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return (Outcome::NotFound, start.elapsed());
        }
        Err(err) => return (Outcome::SpawnFailed(err.to_string()), start.elapsed()),
    };

    let outcome = drain_and_wait(&mut child, params.timeout, params.max_output).await;
    (outcome, start.elapsed())
}

async fn drain_and_wait(child: &mut Child, timeout: Duration, max_output: usize) -> Outcome {
    let Some(stdout) = child.stdout.take() else {
        return Outcome::SpawnFailed("stdout pipe was unexpectedly not available".into());
    };
    let Some(stderr) = child.stderr.take() else {
        return Outcome::SpawnFailed("stderr pipe was unexpectedly not available".into());
    };

    let stdout_handle = tokio::spawn(read_capped(BufReader::new(stdout), max_output));
    let stderr_handle = tokio::spawn(read_capped(BufReader::new(stderr), max_output));

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let stdout = stdout_handle.await.unwrap_or_default();
            let stderr = stderr_handle.await.unwrap_or_default();
            #[cfg(unix)]
            let exit_code = {
                use std::os::unix::process::ExitStatusExt;
                status.code().unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
            };
            #[cfg(not(unix))]
            let exit_code = status.code().unwrap_or(-1);
            Outcome::Exited { exit_code, stdout, stderr }
        }
        Ok(Err(err)) => Outcome::SpawnFailed(err.to_string()),
        Err(_elapsed) => {
            kill_tree(child);
            // The drains keep running past the kill so the child cannot
            // stall on a full pipe while exiting; await them (bounded by
            // `max_output`, not by the child's own lifetime) before
            // reporting the timeout.
            let stdout = stdout_handle.await.unwrap_or_default();
            let stderr = stderr_handle.await.unwrap_or_default();
            let _ = child.wait().await;
            Outcome::TimedOut { stdout, stderr }
        }
    }
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: `killpg` only sends a signal; it does not dereference raw
        // pointers or otherwise violate memory safety. A negative pid
        // targets the process group we placed the child in at spawn time.
        unsafe {
            libc::killpg(pid as i32, libc::SIGKILL);
        }
    }
    let _ = child.start_kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.start_kill();
}

/// Reads `reader` to EOF, copying at most `max_output` bytes into the
/// returned buffer and silently discarding the rest so a chatty child can
/// never force unbounded memory use or stall the drain on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, max_output: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(max_output.min(64 * 1024));
    let mut tmp = [0u8; 8192];
    loop {
        let n = match reader.read(&mut tmp).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        if buf.len() < max_output {
            let remaining = max_output - buf.len();
            buf.extend_from_slice(&tmp[..n.min(remaining)]);
        }
    }
    buf
}

impl Outcome {
    /// Folds an execution outcome into a `CommandResponse`, truncating
    /// captured bytes to valid UTF-8 lossily (spec §3 specifies `stdout`/
    /// `stderr` as strings).
    pub fn into_response(self, duration_ms: u64) -> CommandResponse {
        match self {
            Outcome::Exited { exit_code, stdout, stderr } => CommandResponse {
                exit_code,
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                error: String::new(),
                duration_ms,
            },
            Outcome::TimedOut { stdout, stderr } => CommandResponse {
                exit_code: CommandResponse::TIMEOUT,
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                error: "command execution timed out".to_string(),
                duration_ms,
            },
            Outcome::NotFound => CommandResponse {
                exit_code: CommandResponse::NOT_FOUND,
                stdout: String::new(),
                stderr: String::new(),
                error: "command not found".to_string(),
                duration_ms,
            },
            Outcome::SpawnFailed(reason) => CommandResponse {
                exit_code: CommandResponse::VALIDATION_OR_INTERNAL_FAILURE,
                stdout: String::new(),
                stderr: String::new(),
                error: reason,
                duration_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(command: &str, args: &[&str], timeout: Duration, max_output: usize) -> RunParams {
        RunParams {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            workdir: None,
            env: HashMap::new(),
            timeout,
            max_output,
        }
    }

    #[tokio::test]
    async fn echo_captures_stdout() {
        let (outcome, _) = run(params("/bin/echo", &["hi"], Duration::from_secs(5), 1024)).await;
        let response = outcome.into_response(0);
        assert_eq!(response.exit_code, 0);
        assert_eq!(response.stdout, "hi\n");
        assert_eq!(response.error, "");
    }

    #[tokio::test]
    async fn missing_executable_reports_not_found() {
        let (outcome, _) = run(params(
            "/no/such/executable-beacon-test",
            &[],
            Duration::from_secs(5),
            1024,
        ))
        .await;
        let response = outcome.into_response(0);
        assert_eq!(response.exit_code, CommandResponse::NOT_FOUND);
    }

    #[tokio::test]
    async fn timeout_kills_the_child_and_reports_sentinel_exit_code() {
        let (outcome, elapsed) = run(params(
            "/bin/sleep",
            &["5"],
            Duration::from_millis(200),
            1024,
        ))
        .await;
        let response = outcome.into_response(elapsed.as_millis() as u64);
        assert_eq!(response.exit_code, CommandResponse::TIMEOUT);
        assert_eq!(response.error, "command execution timed out");
        assert!(elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn output_beyond_max_is_silently_truncated() {
        // `/bin/echo` with a long argument is a portable way to produce a
        // known number of output bytes without depending on `yes`/`head`.
        let long = "a".repeat(200);
        let (outcome, _) = run(params("/bin/echo", &[&long], Duration::from_secs(5), 50)).await;
        let response = outcome.into_response(0);
        assert_eq!(response.stdout.len(), 50);
    }
}
