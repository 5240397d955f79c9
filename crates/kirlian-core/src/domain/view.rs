//! What the shell window shows.

use super::failure::{FailureCategory, FailureReason};
use super::launch::SERVING_ADDRESS;
use super::state::SupervisorState;

/// Navigation target for a backend serving on `port`.
pub fn live_url(port: u16) -> String {
    format!("http://{SERVING_ADDRESS}:{port}")
}

/// View currently presented by the shell window.
///
/// Always derived from the latest [`SupervisorState`] via
/// [`WindowViewState::from_supervisor`]; never set directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowViewState {
    Loading,
    Live { url: String },
    Error(ErrorView),
}

/// Error view payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    pub reason: FailureReason,
    pub message: String,
    pub category: FailureCategory,
}

/// Everything the error page presents, ready for a surface to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    pub title: String,
    pub cause: String,
    pub category: FailureCategory,
    /// Remediation steps, most useful first.
    pub hints: Vec<String>,
    /// Tail of backend output captured before the failure.
    pub diagnostics: Vec<String>,
}

impl WindowViewState {
    /// Derive the view from a supervisor state.
    ///
    /// Only `Ready` yields `Live`, so the window cannot navigate before the
    /// backend is reachable. States on either side of a run (idle, starting,
    /// stopping, stopped) all show the loading view.
    pub fn from_supervisor(state: &SupervisorState) -> Self {
        match state {
            SupervisorState::Ready { port } => Self::Live {
                url: live_url(*port),
            },
            SupervisorState::Failed { reason } => Self::Error(ErrorView {
                message: reason.to_string(),
                category: reason.category(),
                reason: reason.clone(),
            }),
            SupervisorState::Idle
            | SupervisorState::Starting { .. }
            | SupervisorState::Stopping { .. }
            | SupervisorState::Stopped => Self::Loading,
        }
    }

    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }
}
