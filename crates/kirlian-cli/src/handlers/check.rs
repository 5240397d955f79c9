//! `check`: preflight without launching.

use std::io::{self, Write};

use kirlian_core::LaunchProfile;
use kirlian_runtime::preflight;
use kirlian_shell::hints_for;

/// Run preflight for `profile` and print the outcome. Returns whether it
/// passed.
pub async fn execute(profile: &LaunchProfile, out: &mut impl Write) -> io::Result<bool> {
    match preflight(profile).await {
        Ok(report) => {
            writeln!(out, "program     = {}", report.program.display())?;
            if let Some(dir) = &report.working_dir {
                writeln!(out, "working dir = {}", dir.display())?;
            }
            if let Some(entry) = &report.entry_point {
                writeln!(out, "entry point = {}", entry.display())?;
            }
            writeln!(out, "Ready to launch.")?;
            Ok(true)
        }
        Err(reason) => {
            let category = reason.category();
            writeln!(out, "{}: {reason}", category.title())?;
            for (i, hint) in hints_for(category).iter().enumerate() {
                writeln!(out, "  {}. {hint}", i + 1)?;
            }
            Ok(false)
        }
    }
}
