//! Failure taxonomy for backend startup and shutdown.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the backend could not be brought up (or brought down cleanly).
///
/// Every startup failure surfaces to the window as exactly one of these.
/// `ShutdownTimeout` is only ever logged: shutdown never blocks on it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum FailureReason {
    /// No port in the scan window accepted a bind.
    #[error("No free port between {start} and {end} ({attempts} ports tried)")]
    PortExhausted { start: u16, end: u16, attempts: u16 },

    /// The executable could not be started at all.
    #[error("Failed to launch `{program}`: {message}")]
    SpawnFailed {
        program: String,
        kind: SpawnFailureKind,
        message: String,
    },

    /// The backend wrote a non-benign line to stderr before it was ready.
    #[error("Backend reported an error during startup: {line}")]
    FatalChildOutput { line: String },

    /// No readiness signal arrived inside the startup window.
    #[error("Backend did not become ready within {:.1}s", *timeout_ms as f64 / 1000.0)]
    StartupTimeout { timeout_ms: u64 },

    /// The backend exited before it was ready.
    #[error("Backend exited before it was ready ({})", describe_exit(*code))]
    PrematureExit { code: Option<i32> },

    /// The backend ignored the graceful stop request and had to be killed.
    #[error("Backend did not exit within {grace_ms} ms of the stop request and was killed")]
    ShutdownTimeout { grace_ms: u64 },

    /// The interpreter cannot import a module the backend needs.
    #[error("Python module `{module}` is not installed for `{program}`")]
    ModuleMissing { program: String, module: String },

    /// The application entry script is missing from the working directory.
    #[error("Application entry point not found: {}", path.display())]
    EntryPointMissing { path: PathBuf },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl FailureReason {
    /// Exit code carried by the failure, if any.
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::PrematureExit { code } => *code,
            _ => None,
        }
    }

    /// Remediation category derived from the reason alone.
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::PortExhausted { .. } => FailureCategory::PortExhaustion,
            Self::SpawnFailed { kind, .. } => match kind {
                SpawnFailureKind::NotFound | SpawnFailureKind::PermissionDenied => {
                    FailureCategory::MissingRuntime
                }
                SpawnFailureKind::Other => FailureCategory::BackendError,
            },
            Self::FatalChildOutput { line } => {
                FailureCategory::from_text(line).unwrap_or(FailureCategory::BackendError)
            }
            Self::StartupTimeout { .. } => FailureCategory::Timeout,
            Self::ModuleMissing { .. } => FailureCategory::MissingDependency,
            Self::EntryPointMissing { .. } => FailureCategory::MissingFiles,
            Self::PrematureExit { .. } | Self::ShutdownTimeout { .. } => {
                FailureCategory::BackendError
            }
        }
    }

    /// Category refined by recent backend output.
    ///
    /// A backend that exits with code 1 says nothing by itself; the lines it
    /// printed on the way out usually do.
    pub fn category_with_output(&self, output: &[String]) -> FailureCategory {
        let base = self.category();
        if base != FailureCategory::BackendError {
            return base;
        }
        output
            .iter()
            .rev()
            .find_map(|line| FailureCategory::from_text(line))
            .unwrap_or(base)
    }
}

/// How a spawn attempt failed at the OS level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpawnFailureKind {
    /// Executable does not exist or is not on `PATH`.
    NotFound,
    /// Executable exists but may not be run by this user.
    PermissionDenied,
    /// Anything else the OS reported.
    Other,
}

impl SpawnFailureKind {
    /// Classify an I/O error kind returned by process spawning.
    pub fn from_io(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Other,
        }
    }
}

/// Remediation bucket shown on the error page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureCategory {
    MissingRuntime,
    MissingDependency,
    MissingFiles,
    PortExhaustion,
    Timeout,
    BackendError,
}

impl FailureCategory {
    /// Recognize a category from well-known diagnostic text.
    pub fn from_text(text: &str) -> Option<Self> {
        const DEPENDENCY: &[&str] = &["No module named", "ModuleNotFoundError", "ImportError"];
        const RUNTIME: &[&str] = &["command not found", "is not recognized", "not recognized as"];
        const PORT: &[&str] = &["Address already in use", "address in use", "EADDRINUSE"];

        if DEPENDENCY.iter().any(|m| text.contains(m)) {
            Some(Self::MissingDependency)
        } else if RUNTIME.iter().any(|m| text.contains(m)) {
            Some(Self::MissingRuntime)
        } else if PORT.iter().any(|m| text.contains(m)) {
            Some(Self::PortExhaustion)
        } else {
            None
        }
    }

    /// Short human-readable heading for the category.
    pub const fn title(self) -> &'static str {
        match self {
            Self::MissingRuntime => "The backend runtime could not be started",
            Self::MissingDependency => "A required package is missing",
            Self::MissingFiles => "Application files are missing",
            Self::PortExhaustion => "No network port is available",
            Self::Timeout => "The backend took too long to start",
            Self::BackendError => "The backend stopped with an error",
        }
    }
}
