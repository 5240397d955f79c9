//! Backend process runtime for kirlian.
//!
//! Port allocation, preflight checks, the process supervisor with its
//! readiness detectors, output capture, and the pidfile-based orphan sweep.

#![deny(unsafe_code)]

pub mod logs;
pub mod pidfile;
pub mod ports;
pub mod preflight;
pub mod readiness;
mod stream;
pub mod supervisor;

pub use logs::{DIAGNOSTIC_TAIL, OutputLine, OutputLog};
pub use pidfile::{BACKEND_PIDFILE, PidFileData, PidFiles, SweepReport, sweep_orphans};
pub use ports::{AllocationError, LoopbackProbe, PortAllocator, PortProbe};
pub use preflight::{PreflightReport, preflight};
pub use readiness::{HttpProbeDetector, OutputMarkerDetector, TcpProbeDetector, detector_for};
pub use supervisor::{
    ChildExit, ChildProcessHandle, PendingStart, ProcessSupervisor, StartOutcome,
    SupervisorConfig, SupervisorError,
};
