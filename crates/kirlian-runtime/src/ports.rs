//! Port allocation for the backend.
//!
//! The bind test is authoritative: every call re-probes the OS, so a port
//! still held by an earlier child in the same session is never handed out
//! again. There is an accepted race between releasing the probe socket and
//! the child binding the port.

use std::net::{Ipv4Addr, TcpListener};

use kirlian_core::FailureReason;
use thiserror::Error;
use tracing::debug;

/// Decides whether a loopback port is currently free.
pub trait PortProbe: Send + Sync {
    fn is_free(&self, port: u16) -> bool;
}

/// Probe that binds `127.0.0.1:<port>` and immediately releases it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackProbe;

impl PortProbe for LoopbackProbe {
    fn is_free(&self, port: u16) -> bool {
        TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .and_then(|listener| listener.local_addr())
            .is_ok()
    }
}

/// No port in the scan window was free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No free port between {start} and {end} ({attempts} tried)")]
pub struct AllocationError {
    pub start: u16,
    pub end: u16,
    pub attempts: u16,
}

impl From<AllocationError> for FailureReason {
    fn from(err: AllocationError) -> Self {
        Self::PortExhausted {
            start: err.start,
            end: err.end,
            attempts: err.attempts,
        }
    }
}

/// Finds the first free port at or above a preferred value.
#[derive(Debug, Clone)]
pub struct PortAllocator<P = LoopbackProbe> {
    probe: P,
    scan_limit: u16,
}

impl PortAllocator<LoopbackProbe> {
    pub fn new(scan_limit: u16) -> Self {
        Self::with_probe(LoopbackProbe, scan_limit)
    }
}

impl<P: PortProbe> PortAllocator<P> {
    pub fn with_probe(probe: P, scan_limit: u16) -> Self {
        Self {
            probe,
            scan_limit: scan_limit.max(1),
        }
    }

    /// Return the first free port in `preferred..preferred + scan_limit`.
    ///
    /// The window is clipped at 65535 rather than wrapping. A preferred
    /// port of 0 is passed through untouched: the backend picks its own.
    pub fn allocate(&self, preferred: u16) -> Result<u16, AllocationError> {
        if preferred == 0 {
            return Ok(0);
        }

        let end = preferred.saturating_add(self.scan_limit - 1);
        let mut attempts: u16 = 0;

        for port in preferred..=end {
            attempts += 1;
            if self.probe.is_free(port) {
                debug!(port, attempts, "Allocated available port");
                return Ok(port);
            }
            debug!(port, "Port unavailable, skipping");
        }

        Err(AllocationError {
            start: preferred,
            end,
            attempts,
        })
    }
}
