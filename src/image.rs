//! Initramfs image packing.
//!
//! Hands the generated manifest to the kernel tree's `gen_init_cpio` and
//! gzips the result. The packer is an external collaborator; this layer
//! only wires the pipeline and propagates failure.

use anyhow::{bail, Result};
use std::path::Path;

use crate::process::shell;

/// Pack a manifest into a compressed initramfs image.
///
/// `packer` is the `gen_init_cpio` binary from the kernel tree. Packing
/// and compression run as separate steps so a packer failure is not
/// masked by a succeeding gzip. Partially written output on failure is
/// left alone; the next run overwrites it.
pub fn pack(packer: &Path, manifest: &Path, output: &Path) -> Result<()> {
    if !manifest.is_file() {
        bail!("manifest not found at {}", manifest.display());
    }

    println!("  Packing {} -> {}", manifest.display(), output.display());

    let cpio = output.with_extension("cpio");
    shell(&format!(
        "{} {} > {}",
        packer.display(),
        manifest.display(),
        cpio.display()
    ))?;
    shell(&format!("gzip -9 -c {} > {}", cpio.display(), output.display()))?;
    let _ = std::fs::remove_file(&cpio);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_missing_manifest_is_fatal() {
        let temp = TempDir::new().unwrap();
        let result = pack(
            Path::new("/bin/true"),
            &temp.path().join("absent.manifest"),
            &temp.path().join("out.img"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pack_pipeline_runs() {
        let temp = TempDir::new().unwrap();

        // Stand-in packer that echoes the manifest back.
        let packer = temp.path().join("fake_gen_init_cpio");
        fs::write(&packer, "#!/bin/sh\ncat \"$1\"\n").unwrap();
        fs::set_permissions(&packer, fs::Permissions::from_mode(0o755)).unwrap();

        let manifest = temp.path().join("initramfs.manifest");
        fs::write(&manifest, "dir /bin 0755 0 0\n").unwrap();

        let output = temp.path().join("initramfs.img");
        pack(&packer, &manifest, &output).unwrap();

        assert!(output.exists());
        assert!(fs::metadata(&output).unwrap().len() > 0);
    }

    #[test]
    fn test_packer_failure_propagates() {
        let temp = TempDir::new().unwrap();
        let manifest = temp.path().join("initramfs.manifest");
        fs::write(&manifest, "dir /bin 0755 0 0\n").unwrap();

        let result = pack(
            Path::new("/bin/false"),
            &manifest,
            &temp.path().join("out.img"),
        );
        assert!(result.is_err());
    }
}
