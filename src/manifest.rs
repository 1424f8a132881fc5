//! Initramfs manifest generation.
//!
//! The manifest is the `gen_init_cpio` description format: one line per
//! entry, `dir`/`file`/`slink` type tags with octal mode and numeric
//! ownership. A fixed prelude (base directories, busybox, the `/bin/sh`
//! symlink, `/init`) is followed by one `file` entry per discovered
//! module, flattened to `/` + its base filename.
//!
//! The manifest is write-once per run: entries are never removed or
//! rewritten, and rendering the same artifact set twice is byte-identical.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::locate::ModuleArtifact;

/// One line of the target filesystem description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntry {
    Directory {
        path: String,
        mode: u32,
        uid: u32,
        gid: u32,
    },
    RegularFile {
        target: String,
        source: PathBuf,
        mode: u32,
        uid: u32,
        gid: u32,
    },
    SymbolicLink {
        target: String,
        link_value: String,
        mode: u32,
        uid: u32,
        gid: u32,
    },
}

impl ManifestEntry {
    fn render(&self, out: &mut String) {
        match self {
            ManifestEntry::Directory {
                path,
                mode,
                uid,
                gid,
            } => {
                let _ = writeln!(out, "dir {} {:04o} {} {}", path, mode, uid, gid);
            }
            ManifestEntry::RegularFile {
                target,
                source,
                mode,
                uid,
                gid,
            } => {
                let _ = writeln!(
                    out,
                    "file {} {} {:04o} {} {}",
                    target,
                    source.display(),
                    mode,
                    uid,
                    gid
                );
            }
            ManifestEntry::SymbolicLink {
                target,
                link_value,
                mode,
                uid,
                gid,
            } => {
                let _ = writeln!(
                    out,
                    "slink {} {} {:04o} {} {}",
                    target, link_value, mode, uid, gid
                );
            }
        }
    }

    /// Destination path this entry claims inside the image.
    pub fn target_path(&self) -> &str {
        match self {
            ManifestEntry::Directory { path, .. } => path,
            ManifestEntry::RegularFile { target, .. } => target,
            ManifestEntry::SymbolicLink { target, .. } => target,
        }
    }
}

/// Ordered, write-once description of the initramfs contents.
#[derive(Debug, Clone)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    prelude_len: usize,
}

impl Manifest {
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Entries past the fixed prelude, one per discovered module.
    pub fn module_entries(&self) -> &[ManifestEntry] {
        &self.entries[self.prelude_len..]
    }

    /// Render to the `gen_init_cpio` text format.
    ///
    /// A blank line separates the prelude from the module entries; the
    /// consumer ignores it, it only keeps diffs readable.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries[..self.prelude_len] {
            entry.render(&mut out);
        }
        out.push('\n');
        for entry in &self.entries[self.prelude_len..] {
            entry.render(&mut out);
        }
        out
    }
}

fn dir(path: &str, mode: u32) -> ManifestEntry {
    ManifestEntry::Directory {
        path: path.to_string(),
        mode,
        uid: 0,
        gid: 0,
    }
}

fn file(target: &str, source: &Path, mode: u32) -> ManifestEntry {
    ManifestEntry::RegularFile {
        target: target.to_string(),
        source: source.to_path_buf(),
        mode,
        uid: 0,
        gid: 0,
    }
}

fn slink(target: &str, link_value: &str, mode: u32) -> ManifestEntry {
    ManifestEntry::SymbolicLink {
        target: target.to_string(),
        link_value: link_value.to_string(),
        mode,
        uid: 0,
        gid: 0,
    }
}

/// Build the manifest for an artifact set.
///
/// `busybox` is the host path of the static multi-tool binary, `init` the
/// host path of the generated init script. Module entries keep the
/// artifact order handed in.
///
/// Two modules sharing a base filename would claim the same flattened
/// target path; that makes the manifest ambiguous, so it is rejected here
/// with both sources named rather than packed silently.
pub fn generate(artifacts: &[ModuleArtifact], busybox: &Path, init: &Path) -> Result<Manifest> {
    let mut entries = vec![
        dir("/bin", 0o755),
        dir("/sbin", 0o755),
        dir("/etc", 0o755),
        dir("/root", 0o700),
        dir("/proc", 0o755),
        dir("/sys", 0o755),
        dir("/tmp", 0o1777),
        file("/bin/busybox", busybox, 0o755),
        slink("/bin/sh", "busybox", 0o755),
        file("/init", init, 0o755),
    ];
    let prelude_len = entries.len();

    let mut claimed: HashMap<String, Option<PathBuf>> = entries
        .iter()
        .map(|e| (e.target_path().to_string(), None))
        .collect();

    for artifact in artifacts {
        let target = format!("/{}", artifact.file_name);
        match claimed.insert(target.clone(), Some(artifact.path.clone())) {
            Some(Some(previous)) => bail!(
                "duplicate initramfs path '{}': {} and {} flatten to the same name.\n\
                 Rename one of the modules.",
                target,
                previous.display(),
                artifact.path.display()
            ),
            Some(None) => bail!(
                "module {} flattens onto reserved initramfs path '{}'",
                artifact.path.display(),
                target
            ),
            None => {}
        }
        entries.push(file(&target, &artifact.path, 0o755));
    }

    Ok(Manifest {
        entries,
        prelude_len,
    })
}
