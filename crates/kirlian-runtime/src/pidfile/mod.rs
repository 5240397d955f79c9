//! PID files for the supervised backend.
//!
//! While a backend runs, its PID, port and executable are recorded under
//! `<data_root>/pids/`. If the shell crashes, the next session finds the
//! file and terminates the leftover backend before starting a new one.
//!
//! - Writes are atomic (temp file + rename).
//! - A PID is only killed after verifying it still runs the recorded
//!   executable; otherwise only the stale file is removed.

mod io;
mod sweep;
mod verify;

pub use io::{BACKEND_PIDFILE, PidFileData, PidFiles};
pub use sweep::{SweepReport, sweep_orphans};
pub use verify::is_running_program;
