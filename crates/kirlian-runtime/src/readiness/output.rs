//! Readiness from the backend's own announcement.

use async_trait::async_trait;
use kirlian_core::{OutputClassifier, ReadinessDetector, ReadinessSignal};

/// Declares the backend ready on the first line carrying a success phrase
/// and a locator.
#[derive(Debug, Clone, Default)]
pub struct OutputMarkerDetector {
    classifier: OutputClassifier,
}

impl OutputMarkerDetector {
    pub const fn new(classifier: OutputClassifier) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl ReadinessDetector for OutputMarkerDetector {
    fn name(&self) -> &'static str {
        "output"
    }

    fn on_stdout(&self, line: &str, expected_port: u16) -> Option<u16> {
        match self.classifier.classify_stdout(line) {
            ReadinessSignal::Ready { port: Some(port), .. } => Some(port),
            ReadinessSignal::Ready { port: None, .. } if expected_port != 0 => Some(expected_port),
            _ => None,
        }
    }
}
