//! Readiness detection port.

use async_trait::async_trait;

/// Decides when a freshly spawned backend is reachable.
///
/// Two kinds of evidence exist and a detector may use either or both:
/// passive (a stdout line announcing the server) and active (probing the
/// port). The supervisor feeds every stdout line to [`on_stdout`] and runs
/// [`wait_ready`] concurrently; whichever yields first wins the startup race.
///
/// [`on_stdout`]: ReadinessDetector::on_stdout
/// [`wait_ready`]: ReadinessDetector::wait_ready
#[async_trait]
pub trait ReadinessDetector: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Inspect one stdout line.
    ///
    /// Returns the port the backend is bound to when the line proves it is
    /// ready. `expected_port` is the allocated port, or 0 when the backend
    /// was asked to choose its own.
    fn on_stdout(&self, _line: &str, _expected_port: u16) -> Option<u16> {
        None
    }

    /// Actively wait until the backend on `port` accepts requests.
    ///
    /// Never returns for passive detectors. Dropping the future cancels the
    /// probe.
    async fn wait_ready(&self, _port: u16) -> u16 {
        std::future::pending::<u16>().await
    }
}
