//! Bounded shellouts to well-known local CLIs (`gh`, `bird`, `yt-dlp`,
//! `instaloader`, `mcporter`).
//!
//! Goals:
//! - **Opportunistic**: use tools when present, never require them.
//! - **Bounded**: every invocation carries a timeout and an output cap.
//! - **No secrets**: no env dumps; callers decide what to surface.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn timeout_from_env_ms(key: &str, default_ms: u64) -> Duration {
    let ms = env(key)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default_ms)
        .clamp(50, 300_000);
    Duration::from_millis(ms)
}

pub fn which(bin: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let cand = dir.join(bin);
        if cand.is_file() {
            return Some(cand);
        }
        if cfg!(windows) {
            let cand = dir.join(format!("{bin}.exe"));
            if cand.is_file() {
                return Some(cand);
            }
        }
    }
    None
}

pub fn has(bin: &str) -> bool {
    which(bin).is_some()
}

/// Run a command and capture stdout (bounded) with a coarse timeout.
///
/// stdout is drained on a separate thread while the parent waits, so a
/// child emitting more than the pipe buffer never wedges on a full pipe.
/// Output past the cap is discarded, not fatal. A timeout kills the child
/// and is reported as a recoverable failure.
pub fn run_stdout_bounded(
    mut cmd: Command,
    timeout: Duration,
    max_stdout_bytes: usize,
) -> Result<Vec<u8>, &'static str> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            "shellout_tool_not_found"
        } else {
            "shellout_spawn_failed"
        }
    })?;

    let stdout = child.stdout.take();
    let drain = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut out = Vec::new();
        if let Some(mut s) = stdout {
            use std::io::Read;
            (&mut s)
                .take(max_stdout_bytes as u64)
                .read_to_end(&mut out)?;
            // Keep consuming past the cap so the child can exit.
            std::io::copy(&mut s, &mut std::io::sink())?;
        }
        Ok(out)
    });

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().map_err(|_| "shellout_wait_failed")? {
            break status;
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err("shellout_timeout");
        }
        std::thread::sleep(Duration::from_millis(25));
    };

    let out = drain
        .join()
        .map_err(|_| "shellout_read_failed")?
        .map_err(|_| "shellout_read_failed")?;
    if !status.success() {
        return Err("shellout_nonzero_exit");
    }
    Ok(out)
}

/// Convenience: run `bin args…` and return clipped UTF-8 stdout.
pub fn run_text(
    bin: &str,
    args: &[&str],
    timeout: Duration,
    max_chars: usize,
) -> Result<String, &'static str> {
    let mut cmd = Command::new(bin);
    cmd.args(args);
    let out = run_stdout_bounded(cmd, timeout, max_chars.saturating_mul(4))?;
    let s = String::from_utf8_lossy(&out);
    Ok(s.chars().take(max_chars).collect())
}

/// Run a command for its exit status only (e.g. `gh auth status`).
pub fn run_ok(bin: &str, args: &[&str], timeout: Duration) -> bool {
    let mut cmd = Command::new(bin);
    cmd.args(args);
    run_stdout_bounded(cmd, timeout, 64 * 1024).is_ok()
}
