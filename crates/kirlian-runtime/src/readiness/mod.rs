//! Readiness detectors.
//!
//! Output matching is the default and works for any backend that
//! announces itself. The probe detectors exist for backends that log
//! nothing useful, at the cost of a short polling delay.

mod output;
mod probe;

use std::sync::Arc;

use kirlian_core::{OutputClassifier, ReadinessDetector, ReadinessStrategy};

pub use output::OutputMarkerDetector;
pub use probe::{HttpProbeDetector, TcpProbeDetector};

/// Build the detector for a configured strategy.
pub fn detector_for(
    strategy: ReadinessStrategy,
    classifier: OutputClassifier,
) -> Arc<dyn ReadinessDetector> {
    match strategy {
        ReadinessStrategy::Output => Arc::new(OutputMarkerDetector::new(classifier)),
        ReadinessStrategy::Tcp => Arc::new(TcpProbeDetector::default()),
        ReadinessStrategy::Http => Arc::new(HttpProbeDetector::default()),
    }
}
