//! Reconciles a [`WindowSurface`] against supervisor state.

use kirlian_core::{SupervisorState, WindowSurface, WindowViewState};
use tracing::debug;

use crate::hints::error_page;

/// The shell window: a surface plus the view it currently shows.
///
/// The view is always derived from [`SupervisorState`], so the surface can
/// never be told to go live before the backend is ready.
pub struct ShellWindow<S> {
    surface: S,
    view: Option<WindowViewState>,
}

impl<S: WindowSurface> ShellWindow<S> {
    pub const fn new(surface: S) -> Self {
        Self {
            surface,
            view: None,
        }
    }

    pub const fn view(&self) -> Option<&WindowViewState> {
        self.view.as_ref()
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// Bring the surface in line with `state`.
    ///
    /// The surface is only called when the derived view changes.
    /// `diagnostics` is consulted only when an error page is rendered.
    pub fn reconcile<F>(&mut self, state: &SupervisorState, diagnostics: F) -> bool
    where
        F: FnOnce() -> Vec<String>,
    {
        let next = WindowViewState::from_supervisor(state);
        if self.view.as_ref() == Some(&next) {
            return false;
        }

        debug!(state = state.name(), "Window view changed");
        match &next {
            WindowViewState::Loading => self.surface.show_loading(),
            WindowViewState::Live { url } => self.surface.show_live(url),
            WindowViewState::Error(view) => {
                let page = error_page(view, diagnostics());
                self.surface.show_error(&page);
            }
        }
        self.view = Some(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surfaces::{RecordingSurface, SurfaceCall};
    use kirlian_core::FailureReason;

    #[test]
    fn surface_called_only_on_view_change() {
        let surface = RecordingSurface::new();
        let calls = surface.calls();
        let mut window = ShellWindow::new(surface);

        assert!(window.reconcile(&SupervisorState::Idle, Vec::new));
        assert!(!window.reconcile(&SupervisorState::Starting { pid: Some(1) }, Vec::new));
        assert!(window.reconcile(&SupervisorState::Ready { port: 8501 }, Vec::new));
        assert!(!window.reconcile(&SupervisorState::Ready { port: 8501 }, Vec::new));

        assert_eq!(
            calls.snapshot(),
            vec![
                SurfaceCall::Loading,
                SurfaceCall::Live("http://localhost:8501".to_string())
            ]
        );
    }

    #[test]
    fn failure_renders_error_page_with_diagnostics() {
        let surface = RecordingSurface::new();
        let calls = surface.calls();
        let mut window = ShellWindow::new(surface);

        let state = SupervisorState::Failed {
            reason: FailureReason::PrematureExit { code: Some(1) },
        };
        window.reconcile(&state, || vec!["ImportError: cannot import name".to_string()]);

        let recorded = calls.snapshot();
        let [SurfaceCall::Error(page)] = recorded.as_slice() else {
            panic!("expected one error call, got {recorded:?}");
        };
        assert_eq!(page.category, kirlian_core::FailureCategory::MissingDependency);
        assert_eq!(page.diagnostics.len(), 1);
        assert!(calls.live_urls().is_empty());
    }
}
