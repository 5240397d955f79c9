//! Page rendering for the shell window.
//!
//! HTML pages are fully self-contained (inline styles, no scripts, no
//! network fetches) so they render even when nothing is listening.

mod html;
mod text;

pub use html::{escape_html, render_error_html, render_loading_html, render_redirect_html};
pub use text::render_error_text;

/// Retry instructions shown on every error rendering.
pub const RETRY_INSTRUCTIONS: &str = "Press Enter in the launcher terminal to retry, or q to close.";
