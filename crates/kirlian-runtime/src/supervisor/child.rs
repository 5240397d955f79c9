//! Ownership of the spawned backend process.
//!
//! The `Child` lives inside a monitor task that waits for exit and applies
//! termination requests. The supervisor only ever holds a
//! [`ChildProcessHandle`], which talks to that task over channels.

use tokio::process::Child;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// How the backend process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildCommand {
    /// Graceful stop request (SIGTERM on Unix).
    Terminate,
    /// Forced kill.
    Kill,
}

/// Handle to a spawned backend, owned by the supervisor.
#[derive(Debug)]
pub struct ChildProcessHandle {
    pid: Option<u32>,
    port: u16,
    commands: mpsc::UnboundedSender<ChildCommand>,
    exit: watch::Receiver<Option<ChildExit>>,
}

impl ChildProcessHandle {
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Port the backend was started with (0 if it chose its own).
    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn exit(&self) -> Option<ChildExit> {
        *self.exit.borrow()
    }

    pub fn is_alive(&self) -> bool {
        self.exit().is_none()
    }

    /// Receiver that observes the exit once the process is reaped.
    pub(crate) fn exit_watch(&self) -> watch::Receiver<Option<ChildExit>> {
        self.exit.clone()
    }

    pub(crate) fn send(&self, command: ChildCommand) {
        if self.commands.send(command).is_err() {
            debug!(pid = ?self.pid, ?command, "Monitor already finished, command dropped");
        }
    }

    /// Wait until the monitor has reaped the process.
    pub(crate) async fn wait_exit(&mut self) -> ChildExit {
        self.exit
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|exit| *exit)
            .unwrap_or(ChildExit { code: None })
    }
}

/// Move `child` into a monitor task that reaps it and publishes the exit.
pub(crate) fn spawn_monitor(mut child: Child, port: u16) -> ChildProcessHandle {
    let pid = child.id();
    let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
    let (exit_tx, exit_rx) = watch::channel(None);

    tokio::spawn(async move {
        let mut commands_open = true;
        let status = loop {
            let command = tokio::select! {
                status = child.wait() => break status,
                command = commands_rx.recv(), if commands_open => command,
            };
            match command {
                Some(ChildCommand::Terminate) => terminate(&mut child),
                Some(ChildCommand::Kill) => kill(&mut child),
                None => {
                    // Handle dropped without a stop; do not leave the process behind.
                    commands_open = false;
                    kill(&mut child);
                }
            }
        };

        let exit = match status {
            Ok(status) => ChildExit {
                code: status.code(),
            },
            Err(e) => {
                warn!(?pid, error = %e, "Failed to wait on backend process");
                ChildExit { code: None }
            }
        };
        debug!(?pid, code = ?exit.code, "Backend process exited");
        exit_tx.send_replace(Some(exit));
    });

    ChildProcessHandle {
        pid,
        port,
        commands: commands_tx,
        exit: exit_rx,
    }
}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            if let Err(e) = super::shutdown::request_termination(pid) {
                warn!(pid, error = %e, "SIGTERM failed, killing instead");
                kill(child);
            }
        }
    }

    #[cfg(not(unix))]
    {
        kill(child);
    }
}

fn kill(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(pid = ?child.id(), error = %e, "Kill request failed (process likely gone)");
    }
}
