//! Termination signals.
//!
//! The supervisor's own escalation lives in [`super::ProcessSupervisor::stop`];
//! this module holds the OS-level pieces it and the orphan sweep share.

use std::io;
use std::time::Duration;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
#[cfg(unix)]
use tokio::time::{Instant, sleep};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(unix)]
fn nix_pid(pid: u32) -> io::Result<Pid> {
    i32::try_from(pid)
        .map(Pid::from_raw)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("PID {pid} out of range")))
}

/// Politely ask `pid` to exit (SIGTERM). A process that is already gone
/// counts as success.
#[cfg(unix)]
pub fn request_termination(pid: u32) -> io::Result<()> {
    match signal::kill(nix_pid(pid)?, Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::other(e)),
    }
}

/// Whether `pid` is alive. Permission errors count as alive.
#[cfg(unix)]
pub fn pid_exists(pid: u32) -> bool {
    let Ok(pid) = nix_pid(pid) else {
        return false;
    };
    !matches!(signal::kill(pid, None), Err(Errno::ESRCH))
}

#[cfg(not(unix))]
pub fn pid_exists(_pid: u32) -> bool {
    false
}

/// Kill a process we have no `Child` handle for (SIGTERM, then SIGKILL
/// after `grace`). Cannot reap; used for orphans of a previous session.
pub async fn kill_pid(pid: u32, grace: Duration) -> io::Result<()> {
    #[cfg(unix)]
    {
        request_termination(pid)?;
        if wait_gone(pid, grace).await {
            return Ok(());
        }

        match signal::kill(nix_pid(pid)?, Signal::SIGKILL) {
            Ok(()) => {}
            Err(Errno::ESRCH) => return Ok(()),
            Err(e) => return Err(io::Error::other(e)),
        }
        if wait_gone(pid, Duration::from_secs(2)).await {
            return Ok(());
        }

        Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("process {pid} did not exit after SIGKILL"),
        ))
    }

    #[cfg(not(unix))]
    {
        let _ = (pid, grace, POLL_INTERVAL);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "orphan cleanup is not implemented on this platform",
        ))
    }
}

#[cfg(unix)]
async fn wait_gone(pid: u32, within: Duration) -> bool {
    let deadline = Instant::now() + within;
    loop {
        if !pid_exists(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}
