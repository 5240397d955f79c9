//! Supervisor lifecycle state.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::failure::FailureReason;

/// Lifecycle of one supervised backend process.
///
/// ```text
/// Idle -> Starting -> Ready -> Stopping -> Stopped
///   |        |                   ^
///   +--------+-> Failed ---------+
/// ```
///
/// Transitions only move forward. `Stopped -> Idle` is the one exception and
/// opens a brand new lifecycle (a retry), never a rewind of the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorState {
    /// Nothing spawned yet.
    Idle,
    /// Child spawned, waiting for a readiness signal.
    Starting { pid: Option<u32> },
    /// Backend is reachable on `port`.
    Ready { port: u16 },
    /// Startup failed; the outcome has been resolved with `reason`.
    Failed { reason: FailureReason },
    /// Graceful stop requested; a forced kill follows at `deadline`.
    Stopping { deadline: Instant },
    /// Process gone and handle released.
    Stopped,
}

impl SupervisorState {
    /// Stable lowercase name, used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting { .. } => "starting",
            Self::Ready { .. } => "ready",
            Self::Failed { .. } => "failed",
            Self::Stopping { .. } => "stopping",
            Self::Stopped => "stopped",
        }
    }

    /// Whether a transition from `self` to `next` is legal.
    pub const fn can_transition_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Starting { .. } | Self::Failed { .. })
                | (
                    Self::Starting { .. },
                    Self::Ready { .. } | Self::Failed { .. } | Self::Stopping { .. }
                )
                | (Self::Ready { .. } | Self::Failed { .. }, Self::Stopping { .. })
                | (Self::Stopping { .. }, Self::Stopped)
                | (Self::Stopped, Self::Idle)
        )
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn transition(&mut self, next: Self) -> Result<(), InvalidTransition> {
        if !self.can_transition_to(&next) {
            return Err(InvalidTransition {
                from: self.name(),
                to: next.name(),
            });
        }
        *self = next;
        Ok(())
    }

    /// Port the backend is serving on, once ready.
    pub const fn ready_port(&self) -> Option<u16> {
        match self {
            Self::Ready { port } => Some(*port),
            _ => None,
        }
    }

    /// Failure reason, once failed.
    pub const fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// True while startup has not resolved yet.
    pub const fn is_starting(&self) -> bool {
        matches!(self, Self::Starting { .. })
    }

    /// True once no process can be running under this lifecycle.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }
}

/// Rejected state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Illegal supervisor transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub to: &'static str,
}

/// Result of a `stop()` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StopOutcome {
    /// There was no process to stop.
    NotRunning,
    /// The process exited within the grace window.
    Graceful { code: Option<i32> },
    /// The grace window elapsed and the process was killed.
    Forced,
}
