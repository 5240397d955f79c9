//! Core domain types and port definitions for the kirlian desktop shell.
//!
//! This crate has no process, socket or window code. It defines the
//! vocabulary shared by the runtime (supervision) and shell (window)
//! crates: supervisor and session states, the failure taxonomy, output
//! classification, launch profiles, settings, and the trait ports
//! adapters implement.

pub mod domain;
pub mod paths;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    BackendCommand, ErrorPage, ErrorView, FailureCategory, FailureReason, InvalidTransition, LaunchProfile,
    OutputClassifier, ReadinessSignal, SessionPhase, SpawnFailureKind, StopOutcome, StreamKind,
    SupervisorState, WindowViewState, live_url,
};
pub use paths::{PathError, data_root, logs_dir, pids_dir};
pub use ports::{NoopLogSink, ReadinessDetector, ServerLogSinkPort, WindowSurface};
pub use settings::{
    DEFAULT_GRACE_SECS, DEFAULT_PREFERRED_PORT, DEFAULT_SCAN_LIMIT, DEFAULT_STARTUP_TIMEOUT_SECS,
    ReadinessStrategy, SettingsError, ShellSettings, validate_settings,
};
