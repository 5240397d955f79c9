//! Settings domain types and validation.
//!
//! Settings are layered: defaults, then environment (`KIRLIAN_*`, usually
//! loaded from `.env` by the binary), then command-line flags. All fields
//! are optional so each layer only overrides what it sets.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// First port tried for the backend (Streamlit's default).
pub const DEFAULT_PREFERRED_PORT: u16 = 8501;

/// Number of consecutive ports scanned before giving up.
pub const DEFAULT_SCAN_LIMIT: u16 = 100;

/// Startup window before the backend is declared hung.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;

/// Grace window between the polite stop signal and the forced kill.
pub const DEFAULT_GRACE_SECS: u64 = 5;

/// Default application entry script.
pub const DEFAULT_APP_SCRIPT: &str = "main.py";

/// How readiness is detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessStrategy {
    /// Watch stdout for a success phrase with a locator.
    #[default]
    Output,
    /// Repeatedly attempt TCP connections to the port.
    Tcp,
    /// Repeatedly issue HTTP requests to the port.
    Http,
}

impl FromStr for ReadinessStrategy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "output" | "stdout" => Ok(Self::Output),
            "tcp" => Ok(Self::Tcp),
            "http" => Ok(Self::Http),
            other => Err(SettingsError::UnknownReadiness(other.to_string())),
        }
    }
}

/// Shell settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellSettings {
    /// First port to try; 0 lets the backend choose and report its own.
    pub preferred_port: Option<u16>,

    /// How many consecutive ports to scan (1-1000).
    pub scan_limit: Option<u16>,

    /// Startup window in milliseconds.
    pub startup_timeout_ms: Option<u64>,

    /// Stop grace window in milliseconds.
    pub grace_ms: Option<u64>,

    /// Readiness detection strategy.
    pub readiness: Option<ReadinessStrategy>,

    /// Python interpreter used for the Streamlit backend.
    pub python: Option<String>,

    /// Application entry script.
    pub app: Option<PathBuf>,

    /// Working directory for the backend.
    pub working_dir: Option<PathBuf>,

    /// Whether to open the system browser.
    pub open_browser: Option<bool>,
}

impl ShellSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            preferred_port: Some(DEFAULT_PREFERRED_PORT),
            scan_limit: Some(DEFAULT_SCAN_LIMIT),
            startup_timeout_ms: Some(DEFAULT_STARTUP_TIMEOUT_SECS * 1000),
            grace_ms: Some(DEFAULT_GRACE_SECS * 1000),
            readiness: Some(ReadinessStrategy::Output),
            python: Some(default_python().to_string()),
            app: Some(PathBuf::from(DEFAULT_APP_SCRIPT)),
            working_dir: None,
            open_browser: Some(true),
        }
    }

    /// Read `KIRLIAN_*` variables through `lookup`.
    ///
    /// Taking a lookup function instead of reading the process environment
    /// directly keeps this testable without mutating global state.
    pub fn from_env<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: FromStr>(
            lookup: &dyn Fn(&str) -> Option<String>,
            key: &'static str,
        ) -> Result<Option<T>, SettingsError> {
            match lookup(key) {
                Some(raw) if !raw.trim().is_empty() => raw
                    .trim()
                    .parse::<T>()
                    .map(Some)
                    .map_err(|_| SettingsError::InvalidValue { key, value: raw }),
                _ => Ok(None),
            }
        }

        let secs_to_ms = |secs: Option<u64>| secs.map(|s| s.saturating_mul(1000));

        Ok(Self {
            preferred_port: parsed(&lookup, "KIRLIAN_PORT")?,
            scan_limit: parsed(&lookup, "KIRLIAN_SCAN_LIMIT")?,
            startup_timeout_ms: secs_to_ms(parsed(&lookup, "KIRLIAN_STARTUP_TIMEOUT_SECS")?),
            grace_ms: secs_to_ms(parsed(&lookup, "KIRLIAN_GRACE_SECS")?),
            readiness: parsed(&lookup, "KIRLIAN_READINESS")?,
            python: lookup("KIRLIAN_PYTHON").filter(|s| !s.trim().is_empty()),
            app: lookup("KIRLIAN_APP")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            working_dir: lookup("KIRLIAN_WORKDIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            open_browser: parsed(&lookup, "KIRLIAN_OPEN_BROWSER")?,
        })
    }

    /// Overlay every field that `other` sets.
    pub fn merge(&mut self, other: &Self) {
        if other.preferred_port.is_some() {
            self.preferred_port = other.preferred_port;
        }
        if other.scan_limit.is_some() {
            self.scan_limit = other.scan_limit;
        }
        if other.startup_timeout_ms.is_some() {
            self.startup_timeout_ms = other.startup_timeout_ms;
        }
        if other.grace_ms.is_some() {
            self.grace_ms = other.grace_ms;
        }
        if other.readiness.is_some() {
            self.readiness = other.readiness;
        }
        if other.python.is_some() {
            self.python.clone_from(&other.python);
        }
        if other.app.is_some() {
            self.app.clone_from(&other.app);
        }
        if other.working_dir.is_some() {
            self.working_dir.clone_from(&other.working_dir);
        }
        if other.open_browser.is_some() {
            self.open_browser = other.open_browser;
        }
    }

    pub fn effective_preferred_port(&self) -> u16 {
        self.preferred_port.unwrap_or(DEFAULT_PREFERRED_PORT)
    }

    pub fn effective_scan_limit(&self) -> u16 {
        self.scan_limit.unwrap_or(DEFAULT_SCAN_LIMIT)
    }

    pub fn effective_startup_timeout(&self) -> Duration {
        Duration::from_millis(
            self.startup_timeout_ms
                .unwrap_or(DEFAULT_STARTUP_TIMEOUT_SECS * 1000),
        )
    }

    pub fn effective_grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms.unwrap_or(DEFAULT_GRACE_SECS * 1000))
    }

    pub fn effective_readiness(&self) -> ReadinessStrategy {
        self.readiness.unwrap_or_default()
    }

    pub fn effective_python(&self) -> &str {
        self.python.as_deref().unwrap_or_else(|| default_python())
    }

    pub fn effective_app(&self) -> PathBuf {
        self.app
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_APP_SCRIPT))
    }

    pub fn effective_open_browser(&self) -> bool {
        self.open_browser.unwrap_or(true)
    }
}

const fn default_python() -> &'static str {
    if cfg!(windows) { "python" } else { "python3" }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Port should be 0 (backend chooses) or >= 1024, got {0}")]
    InvalidPort(u16),

    #[error("Port scan limit must be between 1 and 1000, got {0}")]
    InvalidScanLimit(u16),

    #[error("Startup timeout must be between 100 ms and 10 minutes, got {0} ms")]
    InvalidStartupTimeout(u64),

    #[error("Stop grace window must be between 100 ms and 60 s, got {0} ms")]
    InvalidGrace(u64),

    #[error("Unknown readiness strategy `{0}` (expected output, tcp or http)")]
    UnknownReadiness(String),

    #[error("Readiness strategy `{0:?}` needs a known port; it cannot be combined with port 0")]
    ProbeNeedsPort(ReadinessStrategy),

    #[error("Invalid value for {key}: `{value}`")]
    InvalidValue { key: &'static str, value: String },
}

/// Validate settings.
pub fn validate_settings(settings: &ShellSettings) -> Result<(), SettingsError> {
    if let Some(port) = settings.preferred_port {
        if port != 0 && port < 1024 {
            return Err(SettingsError::InvalidPort(port));
        }
    }

    if let Some(limit) = settings.scan_limit {
        if !(1..=1000).contains(&limit) {
            return Err(SettingsError::InvalidScanLimit(limit));
        }
    }

    if let Some(ms) = settings.startup_timeout_ms {
        if !(100..=600_000).contains(&ms) {
            return Err(SettingsError::InvalidStartupTimeout(ms));
        }
    }

    if let Some(ms) = settings.grace_ms {
        if !(100..=60_000).contains(&ms) {
            return Err(SettingsError::InvalidGrace(ms));
        }
    }

    let readiness = settings.effective_readiness();
    if settings.preferred_port == Some(0) && readiness != ReadinessStrategy::Output {
        return Err(SettingsError::ProbeNeedsPort(readiness));
    }

    Ok(())
}
