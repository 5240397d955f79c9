//! Startup cleanup of backends left behind by a crashed session.

use std::io;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::io::PidFiles;
use super::verify::is_running_program;
use crate::supervisor::shutdown::kill_pid;

/// What the sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Verified orphans that were terminated.
    pub killed: usize,
    /// PID files removed without killing anything.
    pub cleaned: usize,
}

/// Terminate orphaned backends recorded in `files` and remove every pidfile.
///
/// Only PIDs still running the recorded executable are signalled.
pub async fn sweep_orphans(files: &PidFiles, grace: Duration) -> io::Result<SweepReport> {
    let pidfiles = files.list()?;
    let mut report = SweepReport::default();

    if pidfiles.is_empty() {
        debug!("No orphaned PID files found");
        return Ok(report);
    }

    info!(count = pidfiles.len(), "Checking PID files from a previous session");

    for (name, data) in pidfiles {
        if is_running_program(data.pid, &data.program) {
            info!(pid = data.pid, port = data.port, "Terminating orphaned backend");
            match kill_pid(data.pid, grace).await {
                Ok(()) => report.killed += 1,
                Err(e) => {
                    warn!(pid = data.pid, error = %e, "Failed to kill orphaned backend");
                    report.cleaned += 1;
                }
            }
        } else {
            debug!(pid = data.pid, %name, "PID no longer runs the backend, removing stale file");
            report.cleaned += 1;
        }
        files.delete(&name)?;
    }

    if report.killed > 0 || report.cleaned > 0 {
        info!(
            killed = report.killed,
            cleaned = report.cleaned,
            "Orphan sweep complete"
        );
    }

    Ok(report)
}
