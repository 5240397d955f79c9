//! Shared helpers for supervisor integration tests.
//!
//! Fake backends are `/bin/sh -c` scripts; they see the serving overrides
//! (`$KIRLIAN_SERVER_PORT` and friends) exactly like a real backend.

#![allow(dead_code)]

use std::net::{Ipv4Addr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use kirlian_core::{BackendCommand, LaunchProfile, SupervisorState};
use kirlian_runtime::{
    OutputLog, OutputMarkerDetector, PortAllocator, ProcessSupervisor, SupervisorConfig,
};
use tokio::sync::watch;

/// Generous upper bound for anything that should happen "promptly".
pub const PROMPT: Duration = Duration::from_secs(5);

/// Supervisor with the default output detector and a capturing log.
pub fn supervisor(config: SupervisorConfig) -> (ProcessSupervisor, Arc<OutputLog>) {
    let log = Arc::new(OutputLog::new());
    let supervisor = ProcessSupervisor::new(
        config,
        Arc::new(OutputMarkerDetector::default()),
        log.clone(),
    );
    (supervisor, log)
}

/// Config with short windows suitable for tests.
pub fn quick_config() -> SupervisorConfig {
    SupervisorConfig::default()
        .with_startup_timeout(Duration::from_secs(10))
        .with_grace(Duration::from_secs(2))
}

/// Launch profile running `script` under `/bin/sh`.
pub fn sh_profile(script: &str) -> LaunchProfile {
    LaunchProfile::custom("/bin/sh", ["-c", script])
}

/// Rendered `/bin/sh -c script` for `port`.
pub fn sh_command(script: &str, port: u16) -> BackendCommand {
    sh_profile(script).render(port)
}

/// Script that announces readiness on stdout after `delay`, then idles.
pub fn ready_after(delay: &str) -> String {
    format!(
        "sleep {delay}; echo \"  Local URL: http://localhost:$KIRLIAN_SERVER_PORT\"; exec sleep 30"
    )
}

/// A currently free loopback port at or above `from`.
pub fn free_port_from(from: u16) -> u16 {
    PortAllocator::new(1000)
        .allocate(from)
        .unwrap_or_else(|e| panic!("no free port: {e}"))
}

/// Hold a listener on the first free port at or above `from`.
pub fn occupy_port_from(from: u16) -> (TcpListener, u16) {
    let port = free_port_from(from);
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).unwrap();
    (listener, port)
}

/// Wait until the published state satisfies `pred`.
pub async fn wait_for_state<F>(rx: &mut watch::Receiver<SupervisorState>, pred: F) -> SupervisorState
where
    F: FnMut(&SupervisorState) -> bool,
{
    tokio::time::timeout(PROMPT, rx.wait_for(pred))
        .await
        .expect("state not reached in time")
        .expect("supervisor dropped")
        .clone()
}
