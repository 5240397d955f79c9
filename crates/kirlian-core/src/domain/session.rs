//! Shell session phases.

use serde::{Deserialize, Serialize};

/// Phase of the whole shell session, as driven by the lifecycle controller.
///
/// `Initializing -> Starting -> Operational -> ShuttingDown -> Terminated`.
/// A retry after a failed start stays in `Starting`; `Operational -> Starting`
/// is also allowed so a live session can be restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Initializing,
    Starting,
    Operational,
    ShuttingDown,
    Terminated,
}

impl SessionPhase {
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Initializing, Self::Starting)
                | (Self::Starting, Self::Starting | Self::Operational)
                | (Self::Operational, Self::Starting)
                | (
                    Self::Initializing | Self::Starting | Self::Operational,
                    Self::ShuttingDown
                )
                | (Self::ShuttingDown, Self::Terminated)
        )
    }

    /// True once shutdown has begun; further close/quit events are no-ops.
    pub const fn is_closing(self) -> bool {
        matches!(self, Self::ShuttingDown | Self::Terminated)
    }
}
