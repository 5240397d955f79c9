//! Window surface adapters.

mod browser;
#[cfg(any(test, feature = "test-utils"))]
mod recording;
mod terminal;

pub use browser::BrowserSurface;
#[cfg(any(test, feature = "test-utils"))]
pub use recording::{CallLog, RecordingSurface, SurfaceCall};
pub use terminal::TerminalSurface;
