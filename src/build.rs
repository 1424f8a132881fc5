//! Kernel build wrapper.
//!
//! The kernel's own build system does all the work; this just points make
//! at the configured tree and propagates failure. Runs interactively so
//! the operator sees compiler output.

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::config::Config;
use crate::process::Cmd;

/// Build the kernel (and its modules) in the configured source tree.
pub fn build_kernel(config: &Config) -> Result<()> {
    let src = &config.kernel_src;
    if !src.is_dir() {
        bail!(
            "kernel source tree not found at {}.\nSet MODBOOT_KERNEL_SRC or kernel_src in modboot.toml.",
            src.display()
        );
    }
    if !src.join("Makefile").is_file() {
        bail!("invalid kernel source at {} - no Makefile found", src.display());
    }

    let cpus = match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(e) => {
            eprintln!("  [WARN] Could not detect CPU count ({}), using 4 cores", e);
            4
        }
    };

    println!("Building kernel in {}...", src.display());
    Cmd::new("make")
        .args(["-C", &src.to_string_lossy()])
        .args(&config.make_flags)
        .arg(format!("-j{}", cpus))
        .error_msg("kernel build failed")
        .run_interactive()
}

/// Path of the bootable kernel image produced by the build.
pub fn kernel_image(config: &Config) -> PathBuf {
    config.kernel_src.join("arch/x86/boot/bzImage")
}

/// Check the bootable image exists before trying to launch it.
pub fn require_kernel_image(config: &Config) -> Result<PathBuf> {
    let image = kernel_image(config);
    if !image.is_file() {
        bail!(
            "kernel image not found at {}.\nRun 'modboot build' first.",
            image.display()
        );
    }
    Ok(image)
}

/// Resolve the path of the archive packer shipped in the kernel tree.
pub fn gen_init_cpio(config: &Config) -> Result<PathBuf> {
    let tool = config.kernel_src.join("usr/gen_init_cpio");
    if !tool.is_file() {
        bail!(
            "gen_init_cpio not found at {}.\n\
             It is built as part of the kernel; run 'modboot build' first.",
            tool.display()
        );
    }
    Ok(tool)
}
