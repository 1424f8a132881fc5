//! Process-wide configuration.
//!
//! Settings come from an optional `modboot.toml` in the working directory
//! with environment-variable overrides applied on top. The result is an
//! explicit [`Config`] handed to each pipeline component; nothing reads
//! the environment past this point.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Default substring the artifact locator looks for in module paths.
///
/// Modules built with the Rust toolchain carry a `rust` token somewhere in
/// their build path (e.g. `samples/rust/rust_minimal.ko`).
pub const DEFAULT_MODULE_FILTER: &str = "rust";

/// Busybox release the prebuilt static binary is fetched for.
pub const DEFAULT_BUSYBOX_VERSION: &str = "1.36.1";

/// Resolved configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Kernel source/build tree (must contain a Makefile to build).
    pub kernel_src: PathBuf,
    /// Cache directory for the busybox binary and generated outputs.
    pub stash_dir: PathBuf,
    /// Emulator binary name.
    pub qemu_binary: String,
    /// Extra flags passed to every kernel `make` invocation.
    pub make_flags: Vec<String>,
    /// Version string of the prebuilt busybox to fetch.
    pub busybox_version: String,
    /// Optional expected SHA-256 of the fetched busybox binary.
    pub busybox_sha256: Option<String>,
    /// Substring filter applied to discovered module paths.
    pub module_filter: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    kernel_src: Option<String>,
    stash_dir: Option<String>,
    qemu_binary: Option<String>,
    make_flags: Option<Vec<String>>,
    busybox_version: Option<String>,
    busybox_sha256: Option<String>,
    module_filter: Option<String>,
}

impl Config {
    /// Load configuration from `modboot.toml` (if present) plus the
    /// `MODBOOT_*` environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("modboot.toml"))
    }

    /// Load from a specific config file path; a missing file yields the
    /// built-in defaults.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let file = if config_path.is_file() {
            let raw = std::fs::read_to_string(config_path)
                .with_context(|| format!("reading config '{}'", config_path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("parsing config '{}'", config_path.display()))?
        } else {
            ConfigToml::default()
        };

        let kernel_src = env::var("MODBOOT_KERNEL_SRC")
            .ok()
            .or(file.kernel_src)
            .unwrap_or_else(|| "linux".to_string());

        let stash_dir = env::var("MODBOOT_STASH")
            .ok()
            .or(file.stash_dir)
            .map(PathBuf::from)
            .unwrap_or_else(default_stash_dir);

        let qemu_binary = env::var("MODBOOT_QEMU")
            .ok()
            .or(file.qemu_binary)
            .unwrap_or_else(|| "qemu-system-x86_64".to_string());

        let make_flags = env::var("MODBOOT_MAKE_FLAGS")
            .ok()
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .or(file.make_flags)
            .unwrap_or_else(|| vec!["LLVM=1".to_string()]);

        let busybox_version = env::var("MODBOOT_BUSYBOX_VERSION")
            .ok()
            .or(file.busybox_version)
            .unwrap_or_else(|| DEFAULT_BUSYBOX_VERSION.to_string());

        let module_filter = env::var("MODBOOT_MODULE_FILTER")
            .ok()
            .or(file.module_filter)
            .unwrap_or_else(|| DEFAULT_MODULE_FILTER.to_string());

        Ok(Self {
            kernel_src: PathBuf::from(kernel_src),
            stash_dir,
            qemu_binary,
            make_flags,
            busybox_version,
            busybox_sha256: file.busybox_sha256,
            module_filter,
        })
    }

    /// Path the generated manifest is written to.
    pub fn manifest_path(&self) -> PathBuf {
        self.stash_dir.join("initramfs.manifest")
    }

    /// Path the generated init script is written to.
    pub fn init_path(&self) -> PathBuf {
        self.stash_dir.join("init")
    }

    /// Path the packed initramfs image is written to.
    pub fn image_path(&self) -> PathBuf {
        self.stash_dir.join("initramfs.img")
    }
}

fn default_stash_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("modboot")
}
