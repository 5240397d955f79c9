//! Session lifecycle.
//!
//! [`LifecycleController`] owns the supervisor and the window. Supervisor
//! state drives the window; window and application events drive the
//! supervisor. Shutdown runs once, however many close/quit events arrive.

use std::sync::Arc;
use std::time::Duration;

use kirlian_core::{
    FailureReason, LaunchProfile, OutputClassifier, SessionPhase, ShellSettings, StopOutcome,
    SupervisorState, WindowSurface,
};
use kirlian_runtime::{
    BACKEND_PIDFILE, OutputLog, PidFileData, PidFiles, PortAllocator, ProcessSupervisor,
    SupervisorConfig, detector_for, preflight, sweep_orphans,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::window::ShellWindow;

/// Added to the stop grace window to bound the whole shutdown.
pub const SHUTDOWN_SLACK: Duration = Duration::from_secs(3);

/// Lets the rest of a traceback arrive before the error page is rendered.
const ERROR_SETTLE: Duration = Duration::from_millis(150);

/// Events from the window and the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEvent {
    WindowClosed,
    QuitRequested,
    /// Run the start sequence again from port allocation.
    Retry,
}

/// What to launch and where to look for a port.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub profile: LaunchProfile,
    pub preferred_port: u16,
    pub scan_limit: u16,
}

impl LaunchPlan {
    pub fn from_settings(settings: &ShellSettings, profile: LaunchProfile) -> Self {
        Self {
            profile,
            preferred_port: settings.effective_preferred_port(),
            scan_limit: settings.effective_scan_limit(),
        }
    }
}

/// How a session went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub phase: SessionPhase,
    /// Port of the last backend that became ready.
    pub final_port: Option<u16>,
    pub spawns: usize,
    pub stop_calls: usize,
    /// Failure of the most recent start, if it failed.
    pub last_failure: Option<FailureReason>,
}

impl SessionSummary {
    pub const fn last_start_failed(&self) -> bool {
        self.last_failure.is_some()
    }
}

pub struct LifecycleController<S> {
    supervisor: ProcessSupervisor,
    window: ShellWindow<S>,
    log: Arc<OutputLog>,
    plan: LaunchPlan,
    pidfiles: Option<PidFiles>,
    phase: SessionPhase,
    spawns: usize,
    stop_calls: usize,
    final_port: Option<u16>,
    last_failure: Option<FailureReason>,
}

impl<S: WindowSurface> LifecycleController<S> {
    /// Controller with a supervisor configured from `settings`.
    pub fn new(settings: &ShellSettings, profile: LaunchProfile, surface: S) -> Self {
        let log = Arc::new(OutputLog::new());
        let detector = detector_for(settings.effective_readiness(), OutputClassifier::default());
        let supervisor =
            ProcessSupervisor::new(SupervisorConfig::from_settings(settings), detector, log.clone());
        Self::with_supervisor(
            supervisor,
            log,
            LaunchPlan::from_settings(settings, profile),
            surface,
        )
    }

    pub fn with_supervisor(
        supervisor: ProcessSupervisor,
        log: Arc<OutputLog>,
        plan: LaunchPlan,
        surface: S,
    ) -> Self {
        Self {
            supervisor,
            window: ShellWindow::new(surface),
            log,
            plan,
            pidfiles: None,
            phase: SessionPhase::Initializing,
            spawns: 0,
            stop_calls: 0,
            final_port: None,
            last_failure: None,
        }
    }

    /// Record the backend PID and sweep orphans from earlier sessions here.
    #[must_use]
    pub fn with_pidfiles(mut self, pidfiles: PidFiles) -> Self {
        self.pidfiles = Some(pidfiles);
        self
    }

    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub const fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    pub const fn window(&self) -> &ShellWindow<S> {
        &self.window
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            phase: self.phase,
            final_port: self.final_port,
            spawns: self.spawns,
            stop_calls: self.stop_calls,
            last_failure: self.last_failure.clone(),
        }
    }

    /// Run the session until the window closes or the application quits.
    ///
    /// A closed event channel counts as a quit.
    pub async fn run(mut self, mut events: mpsc::Receiver<ShellEvent>) -> SessionSummary {
        let mut states = self.supervisor.subscribe();

        self.sweep_orphans().await;
        self.launch().await;

        loop {
            let state = states.borrow_and_update().clone();
            self.on_state(&state).await;

            tokio::select! {
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                event = events.recv() => match event {
                    Some(ShellEvent::Retry) => self.retry().await,
                    Some(ShellEvent::WindowClosed | ShellEvent::QuitRequested) | None => {
                        debug!(?event, "Close requested");
                        self.shutdown().await;
                        break;
                    }
                },
            }
        }

        self.summary()
    }

    /// Stop the backend and finish the session. Only the first call does
    /// anything; it returns `false` for every later one.
    pub async fn shutdown(&mut self) -> bool {
        if self.phase.is_closing() {
            debug!(phase = ?self.phase, "Shutdown already in progress");
            return false;
        }
        self.set_phase(SessionPhase::ShuttingDown);

        let budget = self.supervisor.config().grace + SHUTDOWN_SLACK;
        match timeout(budget, self.stop_backend()).await {
            Ok(outcome) => info!(?outcome, "Backend shut down"),
            Err(_) => warn!(
                budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                "Backend shutdown exceeded its budget, exiting anyway"
            ),
        }

        self.set_phase(SessionPhase::Terminated);
        true
    }

    async fn on_state(&mut self, state: &SupervisorState) {
        match state {
            SupervisorState::Ready { port } => {
                self.final_port = Some(*port);
                self.set_phase(SessionPhase::Operational);
            }
            SupervisorState::Failed { reason } => {
                self.last_failure = Some(reason.clone());
                tokio::time::sleep(ERROR_SETTLE).await;
            }
            _ => {}
        }
        let log = Arc::clone(&self.log);
        self.window.reconcile(state, || log.diagnostics());
    }

    /// Preflight, allocate, render, spawn, record.
    async fn launch(&mut self) {
        self.set_phase(SessionPhase::Starting);
        self.last_failure = None;
        self.log.clear();

        let report = match preflight(&self.plan.profile).await {
            Ok(report) => report,
            Err(reason) => return self.fail_before_spawn(reason),
        };

        let allocator = PortAllocator::new(self.plan.scan_limit);
        let port = match allocator.allocate(self.plan.preferred_port) {
            Ok(port) => port,
            Err(e) => return self.fail_before_spawn(e.into()),
        };

        let command = self.plan.profile.render(port);
        self.spawns += 1;
        match self.supervisor.start(command, port).await {
            Ok(pending) => {
                if let Some(pid) = pending.pid() {
                    self.record_pid(pid, port, report.program);
                }
            }
            Err(e) => error!(error = %e, "Backend start rejected"),
        }
    }

    /// Restart after a failed start. Ignored otherwise, so a stray retry
    /// never touches a live or still-starting backend.
    async fn retry(&mut self) {
        if self.phase.is_closing() {
            return;
        }
        let failed = self.last_failure.is_some() || self.supervisor.state().failure().is_some();
        if !failed {
            debug!(phase = ?self.phase, "Ignoring retry, the last start did not fail");
            return;
        }
        info!("Retrying backend start");
        self.stop_backend().await;
        self.launch().await;
    }

    async fn stop_backend(&mut self) -> StopOutcome {
        self.stop_calls += 1;
        let outcome = self.supervisor.stop().await;
        if let Some(files) = &self.pidfiles {
            if let Err(e) = files.delete(BACKEND_PIDFILE) {
                warn!(error = %e, "Failed to remove backend pidfile");
            }
        }
        outcome
    }

    fn fail_before_spawn(&self, reason: FailureReason) {
        if let Err(e) = self.supervisor.fail_before_spawn(reason) {
            error!(error = %e, "Could not record startup failure");
        }
    }

    fn record_pid(&self, pid: u32, port: u16, program: std::path::PathBuf) {
        let Some(files) = &self.pidfiles else {
            return;
        };
        let data = PidFileData { pid, port, program };
        if let Err(e) = files.write(BACKEND_PIDFILE, &data) {
            warn!(pid, error = %e, "Failed to write backend pidfile");
        }
    }

    async fn sweep_orphans(&self) {
        let Some(files) = &self.pidfiles else {
            return;
        };
        if let Err(e) = sweep_orphans(files, self.supervisor.config().grace).await {
            warn!(error = %e, "Orphan sweep failed");
        }
    }

    fn set_phase(&mut self, next: SessionPhase) {
        if self.phase == next && next != SessionPhase::Starting {
            return;
        }
        if self.phase.can_transition_to(next) {
            debug!(from = ?self.phase, to = ?next, "Session phase changed");
            self.phase = next;
        } else {
            debug!(from = ?self.phase, to = ?next, "Ignoring session phase change");
        }
    }
}
