//! Terminal-only surface, for `--no-browser` and headless use.

use std::io::{self, Write};

use kirlian_core::{ErrorPage, WindowSurface};
use tracing::warn;

use crate::pages::render_error_text;

pub struct TerminalSurface<W = io::Stdout> {
    out: W,
    app_name: String,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout(app_name: impl Into<String>) -> Self {
        Self::new(io::stdout(), app_name)
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W, app_name: impl Into<String>) -> Self {
        Self {
            out,
            app_name: app_name.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        let result = writeln!(self.out, "{text}").and_then(|()| self.out.flush());
        if let Err(e) = result {
            warn!(error = %e, "Failed to write to terminal");
        }
    }
}

impl<W: Write + Send> WindowSurface for TerminalSurface<W> {
    fn show_loading(&mut self) {
        let text = format!("Starting {}…", self.app_name);
        self.emit(&text);
    }

    fn show_live(&mut self, url: &str) {
        let text = format!("{} is ready at {url}", self.app_name);
        self.emit(&text);
    }

    fn show_error(&mut self, page: &ErrorPage) {
        self.emit(&render_error_text(page));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kirlian_core::FailureCategory;

    #[test]
    fn writes_each_view() {
        let mut surface = TerminalSurface::new(Vec::new(), "Kirlian Platform");
        surface.show_loading();
        surface.show_live("http://localhost:8501");
        surface.show_error(&ErrorPage {
            title: "No network port is available".to_string(),
            cause: "No free port between 8501 and 8600 (100 ports tried)".to_string(),
            category: FailureCategory::PortExhaustion,
            hints: vec!["Close other servers.".to_string()],
            diagnostics: Vec::new(),
        });

        let text = String::from_utf8(surface.into_inner()).unwrap();
        assert!(text.starts_with("Starting Kirlian Platform…\n"));
        assert!(text.contains("Kirlian Platform is ready at http://localhost:8501\n"));
        assert!(text.contains("No network port is available"));
        assert!(text.contains("1. Close other servers."));
    }
}
