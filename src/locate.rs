//! Module artifact discovery.
//!
//! Scans the kernel build tree for compiled loadable modules (`.ko`)
//! whose path contains the configured filter token. Results are sorted by
//! path so the manifest and init generators consume one deterministic
//! order.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A compiled loadable kernel module found in the build tree.
///
/// Identity is the full path; one discovery lives for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleArtifact {
    /// Full path of the `.ko` file in the build tree.
    pub path: PathBuf,
    /// Base filename, e.g. `rust_minimal.ko`.
    pub file_name: String,
}

/// Find all `.ko` files under `build_tree` whose path contains `filter`.
///
/// Zero matches is valid and returns an empty set. A missing build tree is
/// a fatal precondition failure: nothing downstream can run without it.
pub fn find_modules(build_tree: &Path, filter: &str) -> Result<Vec<ModuleArtifact>> {
    if !build_tree.is_dir() {
        bail!(
            "kernel build tree not found at {}.\n\
             Run 'modboot build' first, or set MODBOOT_KERNEL_SRC.",
            build_tree.display()
        );
    }

    let mut artifacts = Vec::new();
    for entry in WalkDir::new(build_tree) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(".ko") {
            continue;
        }
        if !entry.path().to_string_lossy().contains(filter) {
            continue;
        }

        artifacts.push(ModuleArtifact {
            path: entry.path().to_path_buf(),
            file_name: name.to_string(),
        });
    }

    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"\x7fELF").unwrap();
    }

    #[test]
    fn test_finds_matching_modules() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a/rust_foo.ko"));
        touch(&temp.path().join("b/rust_bar.ko"));
        touch(&temp.path().join("c/ext4.ko"));
        touch(&temp.path().join("a/rust_notes.txt"));

        // Sorted by full path, so a/ comes before b/.
        let found = find_modules(temp.path(), "rust").unwrap();
        let names: Vec<_> = found.iter().map(|m| m.file_name.as_str()).collect();
        assert_eq!(names, vec!["rust_foo.ko", "rust_bar.ko"]);
    }

    #[test]
    fn test_filter_matches_anywhere_in_path() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("samples/rust/minimal.ko"));

        let found = find_modules(temp.path(), "rust").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name, "minimal.ko");
    }

    #[test]
    fn test_zero_matches_is_empty_not_error() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("drivers/net/e1000.ko"));

        let found = find_modules(temp.path(), "rust").unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let result = find_modules(&temp.path().join("no-such-tree"), "rust");
        assert!(result.is_err());
    }

    #[test]
    fn test_order_is_deterministic() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("z/rust_z.ko"));
        touch(&temp.path().join("a/rust_a.ko"));
        touch(&temp.path().join("m/rust_m.ko"));

        let first = find_modules(temp.path(), "rust").unwrap();
        let second = find_modules(temp.path(), "rust").unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].file_name, "rust_a.ko");
        assert_eq!(first[2].file_name, "rust_z.ko");
    }
}
