//! Host tool validation.
//!
//! Checks that the external collaborators exist before a run starts, so
//! the operator gets one actionable message instead of a mid-pipeline
//! spawn error.

use anyhow::{bail, Result};

/// Check if a command exists on the host PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Tools needed to assemble and boot an image, as (command, package).
pub const IMAGE_TOOLS: &[(&str, &str)] = &[("gzip", "gzip"), ("sh", "sh")];

/// Tools needed to build the kernel.
pub const BUILD_TOOLS: &[(&str, &str)] = &[("make", "make")];

/// Check that specific tools are available.
///
/// Returns an error listing every missing tool and the package providing
/// it.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();
    for (tool, package) in tools {
        if !command_exists(tool) {
            missing.push((*tool, *package));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }
    Ok(())
}

/// Check everything a `run` needs, including the configured emulator.
pub fn check_run_tools(qemu_binary: &str) -> Result<()> {
    check_required_tools(IMAGE_TOOLS)?;
    if !command_exists(qemu_binary) {
        bail!("emulator '{}' not found on PATH (install: qemu)", qemu_binary);
    }
    Ok(())
}
