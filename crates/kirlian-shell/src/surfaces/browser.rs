//! System-browser surface.
//!
//! The "window" is a local HTML file opened once in the default browser.
//! Loading and error pages reload themselves, so each view written to the
//! file shows up in the same tab; the live view redirects the tab to the
//! backend.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use kirlian_core::{ErrorPage, WindowSurface};
use tracing::{debug, warn};

use super::TerminalSurface;
use crate::pages::{render_error_html, render_loading_html, render_redirect_html};

const PAGE_FILE: &str = "window.html";
const LOADING_REFRESH_SECS: u32 = 1;
const ERROR_REFRESH_SECS: u32 = 2;

type Opener = Box<dyn FnMut(&OsStr) -> io::Result<()> + Send + Sync>;

pub struct BrowserSurface {
    page_path: PathBuf,
    app_name: String,
    terminal: TerminalSurface,
    /// A browser tab currently shows our page file.
    tab_open: bool,
    opener: Opener,
}

impl BrowserSurface {
    /// Surface writing its page under `data_root` and opening it with the
    /// system handler.
    pub fn new(data_root: &Path, app_name: impl Into<String>) -> Self {
        Self::with_opener(data_root, app_name, Box::new(|target: &OsStr| open::that(target)))
    }

    /// Same, with a custom opener (tests, alternative launchers).
    pub fn with_opener(data_root: &Path, app_name: impl Into<String>, opener: Opener) -> Self {
        let app_name = app_name.into();
        Self {
            page_path: data_root.join(PAGE_FILE),
            terminal: TerminalSurface::stdout(app_name.clone()),
            app_name,
            tab_open: false,
            opener,
        }
    }

    pub fn page_path(&self) -> &Path {
        &self.page_path
    }

    fn write_page(&self, html: &str) -> bool {
        match fs::write(&self.page_path, html) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.page_path.display(), error = %e, "Failed to write window page");
                false
            }
        }
    }

    fn open(&mut self, target: &OsStr) -> bool {
        match (self.opener)(target) {
            Ok(()) => {
                debug!(target = %target.to_string_lossy(), "Opened in browser");
                true
            }
            Err(e) => {
                warn!(error = %e, "Could not open the system browser");
                false
            }
        }
    }

    fn show_page(&mut self, html: &str) {
        if self.write_page(html) && !self.tab_open {
            let path = self.page_path.clone();
            self.tab_open = self.open(path.as_os_str());
        }
    }
}

impl WindowSurface for BrowserSurface {
    fn show_loading(&mut self) {
        self.terminal.show_loading();
        let html = render_loading_html(&self.app_name, Some(LOADING_REFRESH_SECS));
        self.show_page(&html);
    }

    fn show_live(&mut self, url: &str) {
        self.terminal.show_live(url);
        self.write_page(&render_redirect_html(url));
        if !self.tab_open {
            self.open(OsStr::new(url));
        }
        // The tab has left our page; the next view needs a fresh one.
        self.tab_open = false;
    }

    fn show_error(&mut self, page: &ErrorPage) {
        self.terminal.show_error(page);
        self.show_page(&render_error_html(page, Some(ERROR_REFRESH_SECS)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_opener() -> (Opener, Arc<Mutex<Vec<String>>>) {
        let opened = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&opened);
        let opener: Opener = Box::new(move |target: &OsStr| {
            sink.lock().unwrap().push(target.to_string_lossy().into_owned());
            Ok(())
        });
        (opener, opened)
    }

    #[test]
    fn one_tab_follows_loading_then_live() {
        let dir = tempfile::tempdir().unwrap();
        let (opener, opened) = recording_opener();
        let mut surface = BrowserSurface::with_opener(dir.path(), "Kirlian", opener);

        surface.show_loading();
        surface.show_live("http://localhost:8501");

        let opened = opened.lock().unwrap();
        assert_eq!(opened.len(), 1, "{opened:?}");
        assert!(opened[0].ends_with(PAGE_FILE));

        let html = fs::read_to_string(surface.page_path()).unwrap();
        assert!(html.contains("url=http://localhost:8501"));
    }

    #[test]
    fn error_page_written_to_data_root() {
        let dir = tempfile::tempdir().unwrap();
        let (opener, opened) = recording_opener();
        let mut surface = BrowserSurface::with_opener(dir.path(), "Kirlian", opener);

        surface.show_error(&ErrorPage {
            title: "Application files are missing".to_string(),
            cause: "Application entry point not found: main.py".to_string(),
            category: kirlian_core::FailureCategory::MissingFiles,
            hints: vec!["Check the folder.".to_string()],
            diagnostics: Vec::new(),
        });

        let html = fs::read_to_string(dir.path().join(PAGE_FILE)).unwrap();
        assert!(html.contains("Application files are missing"));
        assert_eq!(opened.lock().unwrap().len(), 1);
    }

    #[test]
    fn live_without_tab_opens_url_directly() {
        let dir = tempfile::tempdir().unwrap();
        let (opener, opened) = recording_opener();
        let mut surface = BrowserSurface::with_opener(dir.path(), "Kirlian", opener);

        surface.show_live("http://localhost:8502");
        assert_eq!(*opened.lock().unwrap(), vec!["http://localhost:8502".to_string()]);
    }
}
