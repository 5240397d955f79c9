//! Check that a PID still runs the executable we recorded.

use std::path::Path;

#[cfg(target_os = "linux")]
use std::fs;

#[cfg(target_os = "macos")]
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// True when `pid` is alive and its executable is `program`.
///
/// Any doubt (unreadable `/proc`, unsupported platform, deleted binary)
/// yields `false`, so a reused PID is never killed.
pub fn is_running_program(pid: u32, program: &Path) -> bool {
    let Some(actual) = executable_of(pid) else {
        return false;
    };
    match (actual.canonicalize(), program.canonicalize()) {
        (Ok(actual), Ok(expected)) => actual == expected,
        _ => false,
    }
}

#[cfg(target_os = "linux")]
fn executable_of(pid: u32) -> Option<std::path::PathBuf> {
    fs::read_link(format!("/proc/{pid}/exe")).ok()
}

#[cfg(target_os = "macos")]
fn executable_of(pid: u32) -> Option<std::path::PathBuf> {
    let pid = sysinfo::Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_exe(sysinfo::UpdateKind::Always),
    );
    sys.process(pid)?.exe().map(Path::to_path_buf)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn executable_of(_pid: u32) -> Option<std::path::PathBuf> {
    None
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn recognises_own_process() {
        let me = std::env::current_exe().unwrap();
        assert!(is_running_program(std::process::id(), &me));
        assert!(!is_running_program(std::process::id(), Path::new("/bin/sh")));
    }

    #[test]
    fn dead_pid_is_not_ours() {
        assert!(!is_running_program(999_999, Path::new("/bin/sh")));
    }
}
