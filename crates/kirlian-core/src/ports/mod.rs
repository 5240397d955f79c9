//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the supervision core expects from its
//! surroundings. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No process, socket or windowing types in any signature
//! - Readiness strategies are pluggable behind a single trait
//! - Surfaces are told what to show, never asked what they show

pub mod log_sink;
pub mod readiness;
pub mod window;

pub use log_sink::{NoopLogSink, ServerLogSinkPort};
pub use readiness::ReadinessDetector;
pub use window::WindowSurface;
