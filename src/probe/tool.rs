//! Bounded subprocess execution for probers.

use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

/// Run `program` with `args` and return its stdout if it exits successfully
/// within `timeout`.
///
/// A missing binary, a non-zero exit or a timeout all return `None`. The
/// child is killed when the timeout drops its future.
pub(crate) async fn run_tool<I, S>(program: &str, args: I, timeout: Duration) -> Option<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            debug!(%program, error = %e, "Probe tool unavailable");
            return None;
        },
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => Some(output.stdout),
        Ok(Ok(output)) => {
            debug!(%program, status = %output.status, "Probe tool failed");
            None
        },
        Ok(Err(e)) => {
            debug!(%program, error = %e, "Probe tool I/O error");
            None
        },
        Err(_) => {
            warn!(
                %program,
                timeout_secs = timeout.as_secs(),
                "Probe tool timed out, continuing without its output"
            );
            None
        },
    }
}
