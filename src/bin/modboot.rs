use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use modboot::{build, busybox, image, initscript, locate, manifest, preflight, qemu, Config};

fn usage() -> &'static str {
    "Usage:\n  modboot build        build the kernel and modules\n  modboot image        assemble the initramfs image\n  modboot run [--gdb]  boot the kernel under QEMU\n  modboot gdb          attach gdb to a --gdb launch"
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::load()?;

    match args.split_first() {
        Some((cmd, rest)) => match (cmd.as_str(), rest) {
            ("build", []) => {
                preflight::check_required_tools(preflight::BUILD_TOOLS)?;
                build::build_kernel(&config)
            }
            ("image", []) => {
                assemble_image(&config)?;
                Ok(())
            }
            ("run", rest) => run(&config, rest),
            ("gdb", []) => qemu::attach_gdb(&config),
            _ => anyhow::bail!(usage()),
        },
        None => anyhow::bail!(usage()),
    }
}

/// Locate artifacts, generate manifest and init script, pack the image.
fn assemble_image(config: &Config) -> Result<PathBuf> {
    preflight::check_required_tools(preflight::IMAGE_TOOLS)?;
    let packer = build::gen_init_cpio(config)?;
    let busybox_bin = busybox::ensure_busybox(config)?;

    println!("Scanning {} for modules...", config.kernel_src.display());
    let artifacts = locate::find_modules(&config.kernel_src, &config.module_filter)?;
    println!("  Found {} module(s)", artifacts.len());

    fs::create_dir_all(&config.stash_dir).with_context(|| {
        format!("creating stash directory '{}'", config.stash_dir.display())
    })?;

    let init_path = config.init_path();
    let script = initscript::generate(&artifacts);
    fs::write(&init_path, script.render())
        .with_context(|| format!("writing init script '{}'", init_path.display()))?;
    fs::set_permissions(&init_path, fs::Permissions::from_mode(0o755))?;

    let manifest_path = config.manifest_path();
    let manifest = manifest::generate(&artifacts, &busybox_bin, &init_path)?;
    fs::write(&manifest_path, manifest.render())
        .with_context(|| format!("writing manifest '{}'", manifest_path.display()))?;

    let image_path = config.image_path();
    image::pack(&packer, &manifest_path, &image_path)?;
    println!("  Image ready at {}", image_path.display());

    Ok(image_path)
}

fn run(config: &Config, tokens: &[String]) -> Result<()> {
    // Option parsing aborts before any pipeline work or process launch.
    let extra_flags = qemu::parse_run_options(tokens)?;

    preflight::check_run_tools(&config.qemu_binary)?;
    let kernel_image = build::require_kernel_image(config)?;
    let initramfs = assemble_image(config)?;

    qemu::boot(config, &kernel_image, &initramfs, &extra_flags)
}
