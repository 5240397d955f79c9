//! CLI error type and exit codes.

use kirlian_core::{PathError, SettingsError};
use kirlian_runtime::AllocationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Settings from the environment or flags did not validate.
    #[error("Configuration error: {0}")]
    Settings(#[from] SettingsError),

    /// The data directory could not be resolved or created.
    #[error("Data directory error: {0}")]
    Paths(#[from] PathError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No free port in the scan window.
    #[error(transparent)]
    PortExhausted(#[from] AllocationError),
}

impl CliError {
    /// Exit code following sysexits.h where one fits.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Settings(_) => 78,      // EX_CONFIG
            Self::Paths(_) => 73,         // EX_CANTCREAT
            Self::Io(_) => 74,            // EX_IOERR
            Self::PortExhausted(_) => 69, // EX_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_errors_are_config_errors() {
        let err = CliError::from(SettingsError::InvalidPort(80));
        assert_eq!(err.exit_code(), 78);
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn exhaustion_keeps_its_message() {
        let err = CliError::from(AllocationError {
            start: 8501,
            end: 8502,
            attempts: 2,
        });
        assert_eq!(err.exit_code(), 69);
        assert!(err.to_string().contains("8501"));
    }
}
