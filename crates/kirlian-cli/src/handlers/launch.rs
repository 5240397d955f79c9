//! `launch`: run one shell session to completion.

use kirlian_core::{LaunchProfile, ShellSettings, WindowSurface, data_root};
use kirlian_runtime::PidFiles;
use kirlian_shell::{BrowserSurface, LifecycleController, SessionSummary, ShellEvent, TerminalSurface};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::bootstrap::app_name;
use crate::error::CliError;
use crate::events::spawn_terminal_events;

/// Run the session on the browser or terminal surface until the user
/// closes it.
pub async fn execute(
    settings: &ShellSettings,
    profile: LaunchProfile,
) -> Result<SessionSummary, CliError> {
    let name = app_name(&profile);
    let (events_tx, events_rx) = mpsc::channel(16);
    spawn_terminal_events(events_tx);

    let summary = if settings.effective_open_browser() {
        let root = data_root()?;
        run(settings, profile, BrowserSurface::new(&root, name), events_rx).await
    } else {
        run(settings, profile, TerminalSurface::stdout(name), events_rx).await
    };

    info!(
        phase = ?summary.phase,
        port = ?summary.final_port,
        spawns = summary.spawns,
        "Session ended"
    );
    if let Some(reason) = &summary.last_failure {
        warn!(%reason, "Last start failed");
    }
    Ok(summary)
}

async fn run<S: WindowSurface>(
    settings: &ShellSettings,
    profile: LaunchProfile,
    surface: S,
    events: mpsc::Receiver<ShellEvent>,
) -> SessionSummary {
    let controller = LifecycleController::new(settings, profile, surface);
    let controller = match PidFiles::from_data_root() {
        Ok(pidfiles) => controller.with_pidfiles(pidfiles),
        Err(e) => {
            warn!(error = %e, "Running without pidfiles; orphans of this session will not be swept");
            controller
        }
    };
    controller.run(events).await
}
