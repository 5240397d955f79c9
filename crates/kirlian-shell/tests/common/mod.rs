//! Shared helpers for session lifecycle tests.

#![allow(dead_code)]

use std::net::{Ipv4Addr, TcpListener};
use std::time::Duration;

use kirlian_core::{LaunchProfile, ShellSettings};
use kirlian_runtime::{PidFiles, PortAllocator};
use kirlian_shell::{
    CallLog, LifecycleController, RecordingSurface, SessionSummary, ShellEvent,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const PROMPT: Duration = Duration::from_secs(8);

pub fn settings(preferred_port: u16) -> ShellSettings {
    ShellSettings {
        preferred_port: Some(preferred_port),
        scan_limit: Some(100),
        startup_timeout_ms: Some(10_000),
        grace_ms: Some(2_000),
        ..ShellSettings::default()
    }
}

pub fn sh_profile(script: &str) -> LaunchProfile {
    LaunchProfile::custom("/bin/sh", ["-c", script])
}

/// Announce readiness on the port the backend was given, then idle.
pub const READY_SCRIPT: &str =
    "sleep 0.1; echo \"  Local URL: http://localhost:$KIRLIAN_SERVER_PORT\"; exec sleep 30";

pub fn free_port_from(from: u16) -> u16 {
    PortAllocator::new(1000)
        .allocate(from)
        .unwrap_or_else(|e| panic!("no free port: {e}"))
}

pub fn occupy_port_from(from: u16) -> (TcpListener, u16) {
    let port = free_port_from(from);
    (TcpListener::bind((Ipv4Addr::LOCALHOST, port)).unwrap(), port)
}

/// A running session driven through its event channel.
pub struct Session {
    pub events: mpsc::Sender<ShellEvent>,
    pub calls: CallLog,
    pub task: JoinHandle<SessionSummary>,
}

impl Session {
    pub fn spawn(settings: &ShellSettings, profile: LaunchProfile, pidfiles: Option<PidFiles>) -> Self {
        let surface = RecordingSurface::new();
        let calls = surface.calls();
        let mut controller = LifecycleController::new(settings, profile, surface);
        if let Some(files) = pidfiles {
            controller = controller.with_pidfiles(files);
        }
        let (events, rx) = mpsc::channel(8);
        let task = tokio::spawn(controller.run(rx));
        Self {
            events,
            calls,
            task,
        }
    }

    pub async fn send(&self, event: ShellEvent) {
        self.events.send(event).await.unwrap();
    }

    pub async fn finish(self) -> SessionSummary {
        tokio::time::timeout(PROMPT, self.task)
            .await
            .expect("session did not finish")
            .expect("session task panicked")
    }
}
