//! Backend process supervision.
//!
//! [`ProcessSupervisor`] spawns the backend with captured stdio, races the
//! readiness signal against fatal stderr output, the startup timeout and
//! early exit, and later stops it with SIGTERM → SIGKILL escalation.
//!
//! State is published on a `watch` channel; the start outcome is delivered
//! once through [`PendingStart`].

mod arbiter;
mod child;
pub mod shutdown;

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use kirlian_core::{
    BackendCommand, FailureReason, InvalidTransition, OutputClassifier, ReadinessDetector,
    ReadinessSignal, ServerLogSinkPort, ShellSettings, SpawnFailureKind, StopOutcome, StreamKind,
    SupervisorState,
};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::stream::spawn_stream_reader;
use arbiter::OutcomeArbiter;
pub use child::{ChildExit, ChildProcessHandle};
use child::{ChildCommand, spawn_monitor};

/// How long to wait for the output readers to drain after the child exits,
/// so a ready line printed just before exit still counts.
const READER_DRAIN: Duration = Duration::from_millis(500);

/// Supervisor tuning.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Window between spawn and a required readiness signal.
    pub startup_timeout: Duration,
    /// Window between SIGTERM and SIGKILL.
    pub grace: Duration,
    /// Upper bound on waiting for reap confirmation after SIGKILL.
    pub reap_timeout: Duration,
    pub classifier: OutputClassifier,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::from_settings(&ShellSettings::default())
    }
}

impl SupervisorConfig {
    pub fn from_settings(settings: &ShellSettings) -> Self {
        Self {
            startup_timeout: settings.effective_startup_timeout(),
            grace: settings.effective_grace(),
            reap_timeout: Duration::from_secs(1),
            classifier: OutputClassifier::default(),
        }
    }

    #[must_use]
    pub const fn with_startup_timeout(mut self, startup_timeout: Duration) -> Self {
        self.startup_timeout = startup_timeout;
        self
    }

    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

/// How a start attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Backend is reachable on `port`.
    Ready { port: u16 },
    Failed(FailureReason),
}

impl StartOutcome {
    pub fn into_result(self) -> Result<u16, FailureReason> {
        match self {
            Self::Ready { port } => Ok(port),
            Self::Failed(reason) => Err(reason),
        }
    }
}

/// Misuse of the supervisor. Backend failures are never reported this way;
/// they arrive as [`StartOutcome::Failed`].
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Backend lifecycle already active ({state}); stop it before starting again")]
    AlreadyActive { state: &'static str },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// A start in flight.
#[derive(Debug)]
pub struct PendingStart {
    pid: Option<u32>,
    port: u16,
    outcome: oneshot::Receiver<StartOutcome>,
}

impl PendingStart {
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Port the backend was asked to use (0 if it chooses).
    pub const fn requested_port(&self) -> u16 {
        self.port
    }

    /// Wait for the single startup outcome.
    pub async fn outcome(self) -> StartOutcome {
        // The arbiter always resolves before the sender can be dropped.
        self.outcome
            .await
            .unwrap_or(StartOutcome::Failed(FailureReason::PrematureExit { code: None }))
    }
}

/// Shared by every task racing to decide one start.
struct Startup {
    arbiter: OutcomeArbiter,
    state: Arc<watch::Sender<SupervisorState>>,
    cancel: CancellationToken,
}

impl Startup {
    /// Resolve the start if it is still open. The state only moves when it
    /// is still `Starting`; a concurrent `stop()` keeps it on the stopping
    /// path.
    fn settle(&self, outcome: StartOutcome) -> bool {
        let won = self.arbiter.resolve(outcome, |outcome| {
            let next = match outcome {
                StartOutcome::Ready { port } => {
                    info!(port, "Backend ready");
                    SupervisorState::Ready { port: *port }
                }
                StartOutcome::Failed(reason) => {
                    warn!(%reason, "Backend failed to start");
                    SupervisorState::Failed {
                        reason: reason.clone(),
                    }
                }
            };
            self.state.send_if_modified(|state| {
                state.is_starting() && state.transition(next).is_ok()
            });
        });
        if won {
            self.cancel.cancel();
        }
        won
    }

    fn is_settled(&self) -> bool {
        self.arbiter.is_resolved()
    }
}

/// Owns one backend process at a time.
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    detector: Arc<dyn ReadinessDetector>,
    sink: Arc<dyn ServerLogSinkPort>,
    state: Arc<watch::Sender<SupervisorState>>,
    child: Mutex<Option<ChildProcessHandle>>,
}

impl ProcessSupervisor {
    pub fn new(
        config: SupervisorConfig,
        detector: Arc<dyn ReadinessDetector>,
        sink: Arc<dyn ServerLogSinkPort>,
    ) -> Self {
        let (state, _) = watch::channel(SupervisorState::Idle);
        Self {
            config,
            detector,
            sink,
            state: Arc::new(state),
            child: Mutex::new(None),
        }
    }

    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Observe state changes. The receiver always sees the latest state.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SupervisorState {
        self.state.borrow().clone()
    }

    /// PID of the live backend, if any.
    pub async fn pid(&self) -> Option<u32> {
        self.child
            .lock()
            .await
            .as_ref()
            .filter(|handle| handle.is_alive())
            .and_then(ChildProcessHandle::pid)
    }

    /// Record a failure that happened before anything was spawned
    /// (port exhaustion, preflight).
    pub fn fail_before_spawn(&self, reason: FailureReason) -> Result<(), SupervisorError> {
        self.begin_lifecycle()?;
        warn!(%reason, "Backend start aborted before spawn");
        self.transition(SupervisorState::Failed { reason })?;
        Ok(())
    }

    /// Spawn the backend and begin waiting for readiness.
    ///
    /// Returns immediately; await [`PendingStart::outcome`] for the result.
    /// `port` is the allocated port the command was rendered with, or 0
    /// when the backend picks its own and reports it on stdout.
    pub async fn start(
        &self,
        command: BackendCommand,
        port: u16,
    ) -> Result<PendingStart, SupervisorError> {
        let mut slot = self.child.lock().await;
        if slot.as_ref().is_some_and(ChildProcessHandle::is_alive) {
            return Err(SupervisorError::AlreadyActive {
                state: self.state.borrow().name(),
            });
        }
        self.begin_lifecycle()?;
        *slot = None;

        let (arbiter, outcome) = OutcomeArbiter::new();
        let startup = Arc::new(Startup {
            arbiter,
            state: Arc::clone(&self.state),
            cancel: CancellationToken::new(),
        });

        info!(%command, port, "Spawning backend");
        let mut child = match build_command(&command).spawn() {
            Ok(child) => child,
            Err(e) => {
                let reason = FailureReason::SpawnFailed {
                    program: command.program.clone(),
                    kind: SpawnFailureKind::from_io(e.kind()),
                    message: e.to_string(),
                };
                warn!(%reason, "Backend spawn failed");
                self.transition(SupervisorState::Failed {
                    reason: reason.clone(),
                })?;
                startup
                    .arbiter
                    .resolve(StartOutcome::Failed(reason), |_| {});
                return Ok(PendingStart {
                    pid: None,
                    port,
                    outcome,
                });
            }
        };

        let pid = child.id();
        self.transition(SupervisorState::Starting { pid })?;
        debug!(?pid, port, "Backend spawned");

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(self.watch_stdout(stdout, port, &startup));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(self.watch_stderr(stderr, port, &startup));
        }
        self.spawn_timer(&startup);
        self.spawn_probe(&startup, port);

        let handle = spawn_monitor(child, port);
        spawn_exit_observer(handle.exit_watch(), readers, Arc::clone(&startup));
        *slot = Some(handle);

        Ok(PendingStart { pid, port, outcome })
    }

    /// Stop the backend: SIGTERM, then SIGKILL after the grace window.
    ///
    /// Idempotent. Calls with nothing to stop, including concurrent calls
    /// that lose the race for the handle, return [`StopOutcome::NotRunning`].
    pub async fn stop(&self) -> StopOutcome {
        let mut slot = self.child.lock().await;
        let Some(mut handle) = slot.take() else {
            self.wind_down();
            return StopOutcome::NotRunning;
        };

        if !handle.is_alive() {
            debug!(pid = ?handle.pid(), "Backend already exited, releasing handle");
            self.wind_down();
            return StopOutcome::NotRunning;
        }

        let grace = self.config.grace;
        self.enter_stopping(grace);
        info!(pid = ?handle.pid(), grace_ms = millis(grace), "Stopping backend");
        handle.send(ChildCommand::Terminate);

        let outcome = if let Ok(exit) = timeout(grace, handle.wait_exit()).await {
            info!(pid = ?handle.pid(), code = ?exit.code, "Backend stopped");
            StopOutcome::Graceful { code: exit.code }
        } else {
            let reason = FailureReason::ShutdownTimeout {
                grace_ms: millis(grace),
            };
            warn!(pid = ?handle.pid(), "{reason}");
            handle.send(ChildCommand::Kill);
            if timeout(self.config.reap_timeout, handle.wait_exit())
                .await
                .is_err()
            {
                warn!(pid = ?handle.pid(), "Backend not reaped after kill, continuing");
            }
            StopOutcome::Forced
        };

        if let Err(e) = self.transition(SupervisorState::Stopped) {
            debug!(error = %e, "Unexpected state after stop");
        }
        outcome
    }

    fn watch_stdout(
        &self,
        stdout: tokio::process::ChildStdout,
        port: u16,
        startup: &Arc<Startup>,
    ) -> JoinHandle<()> {
        let startup = Arc::clone(startup);
        let detector = Arc::clone(&self.detector);
        spawn_stream_reader(
            stdout,
            port,
            StreamKind::Stdout,
            Arc::clone(&self.sink),
            move |line| {
                if !startup.is_settled() {
                    announce_if_ready(&startup, detector.as_ref(), line, port);
                }
            },
        )
    }

    fn watch_stderr(
        &self,
        stderr: tokio::process::ChildStderr,
        port: u16,
        startup: &Arc<Startup>,
    ) -> JoinHandle<()> {
        let startup = Arc::clone(startup);
        let detector = Arc::clone(&self.detector);
        let classifier = self.config.classifier.clone();
        spawn_stream_reader(
            stderr,
            port,
            StreamKind::Stderr,
            Arc::clone(&self.sink),
            move |line| {
                if startup.is_settled() {
                    return;
                }
                // Some servers (uvicorn, werkzeug) announce themselves on stderr.
                if announce_if_ready(&startup, detector.as_ref(), line, port) {
                    return;
                }
                if let ReadinessSignal::Fatal(message) = classifier.classify_stderr(line) {
                    startup.settle(StartOutcome::Failed(FailureReason::FatalChildOutput {
                        line: message,
                    }));
                }
            },
        )
    }

    fn spawn_timer(&self, startup: &Arc<Startup>) {
        let startup = Arc::clone(startup);
        let window = self.config.startup_timeout;
        tokio::spawn(async move {
            tokio::select! {
                () = startup.cancel.cancelled() => {}
                () = tokio::time::sleep(window) => {
                    startup.settle(StartOutcome::Failed(FailureReason::StartupTimeout {
                        timeout_ms: millis(window),
                    }));
                }
            }
        });
    }

    fn spawn_probe(&self, startup: &Arc<Startup>, port: u16) {
        let startup = Arc::clone(startup);
        let detector = Arc::clone(&self.detector);
        tokio::spawn(async move {
            tokio::select! {
                () = startup.cancel.cancelled() => {}
                bound = detector.wait_ready(port) => {
                    debug!(port = bound, detector = detector.name(), "Probe succeeded");
                    startup.settle(StartOutcome::Ready { port: bound });
                }
            }
        });
    }

    /// `Stopped -> Idle` for a new lifecycle; anything but idle is busy.
    fn begin_lifecycle(&self) -> Result<(), SupervisorError> {
        let mut busy = None;
        self.state.send_if_modified(|state| {
            if matches!(state, SupervisorState::Stopped) {
                return state.transition(SupervisorState::Idle).is_ok();
            }
            if !matches!(state, SupervisorState::Idle) {
                busy = Some(state.name());
            }
            false
        });
        match busy {
            Some(state) => Err(SupervisorError::AlreadyActive { state }),
            None => Ok(()),
        }
    }

    fn enter_stopping(&self, grace: Duration) {
        let deadline = std::time::Instant::now() + grace;
        if let Err(e) = self.transition(SupervisorState::Stopping { deadline }) {
            debug!(error = %e, "Stop requested outside an active lifecycle");
        }
    }

    /// Close out a lifecycle whose process is already gone (or never existed).
    fn wind_down(&self) {
        let active = matches!(
            *self.state.borrow(),
            SupervisorState::Starting { .. }
                | SupervisorState::Ready { .. }
                | SupervisorState::Failed { .. }
        );
        if active {
            self.enter_stopping(Duration::ZERO);
            if let Err(e) = self.transition(SupervisorState::Stopped) {
                debug!(error = %e, "Unexpected state while winding down");
            }
        }
    }

    fn transition(&self, next: SupervisorState) -> Result<(), InvalidTransition> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            let from = state.name();
            match state.transition(next) {
                Ok(()) => {
                    debug!(from, to = state.name(), "Supervisor state changed");
                    true
                }
                Err(e) => {
                    result = Err(e);
                    false
                }
            }
        });
        result
    }
}

fn announce_if_ready(
    startup: &Startup,
    detector: &dyn ReadinessDetector,
    line: &str,
    port: u16,
) -> bool {
    let Some(bound) = detector.on_stdout(line, port) else {
        return false;
    };
    if port != 0 && bound != port {
        warn!(
            requested = port,
            announced = bound,
            "Backend announced a different port, using the announced one"
        );
    }
    startup.settle(StartOutcome::Ready { port: bound });
    true
}

/// After the process is reaped, let the readers drain and then report an
/// early exit (a no-op if startup already resolved).
fn spawn_exit_observer(
    mut exit: watch::Receiver<Option<ChildExit>>,
    readers: Vec<JoinHandle<()>>,
    startup: Arc<Startup>,
) {
    tokio::spawn(async move {
        let code = match exit.wait_for(Option::is_some).await {
            Ok(reaped) => (*reaped).and_then(|e| e.code),
            Err(_) => None,
        };
        let drained = timeout(READER_DRAIN, async {
            for reader in readers {
                let _ = reader.await;
            }
        })
        .await;
        if drained.is_err() {
            debug!("Output readers still open after exit (inherited pipes)");
        }
        if !startup.settle(StartOutcome::Failed(FailureReason::PrematureExit { code })) {
            debug!(?code, "Backend exited after startup resolved");
        }
    });
}

fn build_command(backend: &BackendCommand) -> Command {
    let mut cmd = Command::new(&backend.program);
    cmd.args(&backend.args)
        .envs(backend.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &backend.working_dir {
        cmd.current_dir(dir);
    }
    // Own process group: a terminal Ctrl-C reaches us, and we decide how
    // the backend is stopped.
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
