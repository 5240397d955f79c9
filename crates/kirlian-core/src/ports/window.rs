//! Native window surface port.

use crate::domain::ErrorPage;

/// The surface the shell draws into: a webview, a system browser, a
/// terminal. It is told what to show and does not track state itself.
///
/// Surfaces report their own I/O problems through logging; a surface that
/// cannot open a browser still has to leave the user with something to
/// read.
pub trait WindowSurface: Send {
    /// Show the "starting backend" view.
    fn show_loading(&mut self);

    /// Navigate to the live backend.
    fn show_live(&mut self, url: &str);

    /// Show the failure page with its remediation hints.
    fn show_error(&mut self, page: &ErrorPage);
}
