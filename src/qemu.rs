//! QEMU launch and debugger attachment.
//!
//! Builds the boot command for a kernel image plus initramfs, with a
//! deliberately tiny option surface: the only recognized launch option is
//! `--gdb`, which adds QEMU's gdb stub pair (`-s -S`, listen on :1234 and
//! halt at boot). Anything else aborts with the usage message before any
//! process is spawned.

use anyhow::{bail, Result};
use std::path::Path;
use std::process::Command;

use crate::config::Config;
use crate::process::Cmd;

/// Flag pair appended by `--gdb`: gdb stub on :1234, halted at boot.
pub const DEBUG_FLAGS: &[&str] = &["-s", "-S"];

/// Port the QEMU gdb stub listens on (fixed, `-s` shorthand).
pub const GDB_PORT: u16 = 1234;

const RUN_USAGE: &str = "Usage: modboot run [--gdb]";

/// Parse the free-form option tokens for `modboot run`.
///
/// Linear scan, early exit: the first unrecognized token fails the whole
/// launch regardless of what follows it. An empty list is valid and adds
/// nothing.
pub fn parse_run_options(tokens: &[String]) -> Result<Vec<&'static str>> {
    let mut extra = Vec::new();
    for token in tokens {
        match token.as_str() {
            "--gdb" => extra.extend_from_slice(DEBUG_FLAGS),
            other => bail!("unrecognized option '{}'\n{}", other, RUN_USAGE),
        }
    }
    Ok(extra)
}

/// Build the QEMU invocation for a kernel and initramfs image.
pub fn boot_command(
    config: &Config,
    kernel_image: &Path,
    initramfs: &Path,
    extra_flags: &[&str],
) -> Command {
    let mut cmd = Command::new(&config.qemu_binary);

    cmd.arg("-kernel").arg(kernel_image);
    cmd.arg("-initrd").arg(initramfs);
    cmd.args(["-machine", "q35"]);
    cmd.args(["-m", "1G"]);
    cmd.args(["-cpu", "max"]);
    cmd.args(["-smp", "2"]);
    cmd.args(["-nographic", "-no-reboot"]);
    cmd.args(["-append", "console=ttyS0"]);
    cmd.args(extra_flags);

    cmd
}

/// Boot the kernel, blocking until QEMU exits.
pub fn boot(
    config: &Config,
    kernel_image: &Path,
    initramfs: &Path,
    extra_flags: &[&str],
) -> Result<()> {
    if !kernel_image.is_file() {
        bail!(
            "kernel image not found at {}.\nRun 'modboot build' first.",
            kernel_image.display()
        );
    }
    if !initramfs.is_file() {
        bail!(
            "initramfs not found at {}.\nRun 'modboot image' first.",
            initramfs.display()
        );
    }

    println!("Booting {} under {}...", kernel_image.display(), config.qemu_binary);
    if extra_flags == DEBUG_FLAGS {
        println!("  gdb stub enabled on :{}, waiting for 'modboot gdb'", GDB_PORT);
    }

    let status = boot_command(config, kernel_image, initramfs, extra_flags)
        .status()
        .map_err(|e| anyhow::anyhow!("failed to spawn '{}': {}", config.qemu_binary, e))?;

    if !status.success() {
        bail!("{} exited with {}", config.qemu_binary, status);
    }
    Ok(())
}

/// Attach gdb to a running emulator started with `--gdb`.
pub fn attach_gdb(config: &Config) -> Result<()> {
    let vmlinux = config.kernel_src.join("vmlinux");
    if !vmlinux.is_file() {
        bail!(
            "vmlinux not found at {}.\nRun 'modboot build' first.",
            vmlinux.display()
        );
    }

    Cmd::new("gdb")
        .arg_path(&vmlinux)
        .args(["-ex", &format!("target remote localhost:{}", GDB_PORT)])
        .error_msg("gdb session failed. Was QEMU started with 'modboot run --gdb'?")
        .run_interactive()
}
