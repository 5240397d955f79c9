//! Domain types for backend supervision and the shell session.
//!
//! These are pure types with no infrastructure dependencies. Anything that
//! touches a process, a socket or a window lives in the adapter crates.

mod failure;
mod launch;
mod session;
mod signal;
mod state;
mod view;

pub use failure::{FailureCategory, FailureReason, SpawnFailureKind};
pub use launch::{BackendCommand, LaunchProfile, SERVING_ADDRESS};
pub use session::SessionPhase;
pub use signal::{OutputClassifier, ReadinessSignal, StreamKind};
pub use state::{InvalidTransition, StopOutcome, SupervisorState};
pub use view::{ErrorPage, ErrorView, WindowViewState, live_url};
