//! Window side of the kirlian desktop shell.
//!
//! Pages and hints for each window view, the surfaces that display them,
//! and the lifecycle controller that ties the window to the backend
//! supervisor.

#![deny(unsafe_code)]

pub mod hints;
pub mod lifecycle;
pub mod pages;
pub mod surfaces;
pub mod window;

pub use hints::{error_page, hints_for};
pub use lifecycle::{LaunchPlan, LifecycleController, SessionSummary, ShellEvent, SHUTDOWN_SLACK};
pub use surfaces::{BrowserSurface, TerminalSurface};
#[cfg(any(test, feature = "test-utils"))]
pub use surfaces::{CallLog, RecordingSurface, SurfaceCall};
pub use window::ShellWindow;
