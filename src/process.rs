//! Subprocess execution with wall-clock timing and a hard timeout
//!
//! Every external tool call in the harness goes through `run_with_timeout`.
//! Latency is measured around spawn-to-exit of the single child, never
//! around a batch.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Poll interval while waiting on a child
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Finer polling for the first stretch, where fast tools finish
const FAST_POLL_INTERVAL: Duration = Duration::from_micros(100);
const FAST_POLL_WINDOW: Duration = Duration::from_millis(50);

/// Captured result of one child process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit status, `None` when the child was killed on timeout
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    pub timed_out: bool,
}

impl ProcessOutput {
    /// Exit code if the process exited normally
    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }

    pub fn success(&self) -> bool {
        self.status.map(|s| s.success()).unwrap_or(false)
    }

    /// Elapsed wall-clock time in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Run a program to completion, killing it after `timeout`
///
/// Spawn failures (binary missing, permission denied) are returned as
/// `io::Error`; everything after a successful spawn is data.
pub fn run_with_timeout(
    program: &Path,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> io::Result<ProcessOutput> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    tracing::debug!(program = %program.display(), ?args, "spawning");

    let start = Instant::now();
    let mut child = command.spawn()?;

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let (status, timed_out) = wait_with_deadline(&mut child, start, timeout)?;
    let elapsed = start.elapsed();

    // Grandchildren can hold the pipes open after a kill; leave the
    // readers detached instead of blocking on them.
    let (stdout, stderr) = if timed_out {
        tracing::warn!(
            program = %program.display(),
            timeout_ms = timeout.as_millis() as u64,
            "process timed out and was killed"
        );
        (String::new(), String::new())
    } else {
        (join_reader(stdout_reader), join_reader(stderr_reader))
    };

    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
        elapsed,
        timed_out,
    })
}

/// Sleep between exit checks; latency error is bounded by this
fn poll_interval(elapsed: Duration) -> Duration {
    if elapsed < FAST_POLL_WINDOW {
        FAST_POLL_INTERVAL
    } else {
        POLL_INTERVAL
    }
}

fn wait_with_deadline(
    child: &mut Child,
    start: Instant,
    timeout: Duration,
) -> io::Result<(Option<ExitStatus>, bool)> {
    let deadline = start + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((Some(status), false));
        }
        if Instant::now() >= deadline {
            // Child may exit between try_wait and kill
            let _ = child.kill();
            let _ = child.wait();
            return Ok((None, true));
        }
        thread::sleep(poll_interval(start.elapsed()));
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Option<thread::JoinHandle<String>> {
    source.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Flatten stderr to one line and cap its length for CSV output
pub fn one_line(text: &str, max_chars: usize) -> String {
    let flat = text.trim().replace(['\r', '\n'], " ");
    flat.chars().take(max_chars).collect()
}
