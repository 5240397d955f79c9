//! `port`: show where the next launch would bind.

use std::io::Write;

use kirlian_core::ShellSettings;
use kirlian_runtime::{PortAllocator, PortProbe};

use crate::error::CliError;

/// Allocate from `from` (or the configured preferred port) and print it.
pub fn execute<P: PortProbe>(
    allocator: &PortAllocator<P>,
    settings: &ShellSettings,
    from: Option<u16>,
    out: &mut impl Write,
) -> Result<u16, CliError> {
    let preferred = from.unwrap_or_else(|| settings.effective_preferred_port());
    let port = allocator.allocate(preferred)?;
    writeln!(out, "{port}")?;
    Ok(port)
}
