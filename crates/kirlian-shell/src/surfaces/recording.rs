//! Surface that records every call, for tests.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use kirlian_core::{ErrorPage, WindowSurface};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Loading,
    Live(String),
    Error(ErrorPage),
}

/// Shared view of the calls a [`RecordingSurface`] received.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<SurfaceCall>>>);

impl CallLog {
    fn push(&self, call: SurfaceCall) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    pub fn snapshot(&self) -> Vec<SurfaceCall> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn live_urls(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::Live(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ErrorPage> {
        self.snapshot()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::Error(page) => Some(page),
                _ => None,
            })
            .collect()
    }

    /// Poll until a recorded call satisfies `pred`, up to `within`.
    pub async fn wait_for<F>(&self, within: Duration, mut pred: F) -> Option<SurfaceCall>
    where
        F: FnMut(&SurfaceCall) -> bool,
    {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            if let Some(call) = self.snapshot().into_iter().find(|c| pred(c)) {
                return Some(call);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    calls: CallLog,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that stays valid after the surface is moved.
    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

impl WindowSurface for RecordingSurface {
    fn show_loading(&mut self) {
        self.calls.push(SurfaceCall::Loading);
    }

    fn show_live(&mut self, url: &str) {
        self.calls.push(SurfaceCall::Live(url.to_string()));
    }

    fn show_error(&mut self, page: &ErrorPage) {
        self.calls.push(SurfaceCall::Error(page.clone()));
    }
}
