//! Fetch-if-absent cache of the prebuilt static busybox binary.
//!
//! The guest userland is a single statically linked busybox. Upstream
//! publishes prebuilt binaries per release; one is fetched into the stash
//! directory the first time and reused afterwards. An optional SHA-256
//! digest from the config is verified after download.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::Config;

/// Network timeout for the busybox download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// URL of the prebuilt static x86_64 binary for a busybox release.
fn download_url(version: &str) -> String {
    format!(
        "https://busybox.net/downloads/binaries/{}-defconfig-multiarch-musl/busybox-x86_64",
        version
    )
}

/// Cached binary path for a busybox release inside the stash.
pub fn cached_path(stash_dir: &Path, version: &str) -> PathBuf {
    stash_dir.join(format!("busybox-{}", version))
}

/// Return the cached busybox binary, downloading it first if absent.
pub fn ensure_busybox(config: &Config) -> Result<PathBuf> {
    let dest = cached_path(&config.stash_dir, &config.busybox_version);
    if dest.is_file() {
        return Ok(dest);
    }

    fs::create_dir_all(&config.stash_dir).with_context(|| {
        format!("creating stash directory '{}'", config.stash_dir.display())
    })?;

    let url = download_url(&config.busybox_version);
    println!("  Fetching busybox {} from {}", config.busybox_version, url);

    let partial = dest.with_extension("partial");
    download_to_file(&url, &partial)?;

    if let Some(expected) = &config.busybox_sha256 {
        verify_sha256(&partial, expected)?;
    }

    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(&partial, fs::Permissions::from_mode(0o755))?;
    fs::rename(&partial, &dest)?;

    if !dest.is_file() {
        bail!("busybox missing at {} after download", dest.display());
    }
    Ok(dest)
}

fn download_to_file(url: &str, dest: &Path) -> Result<()> {
    let response = http_agent()
        .get(url)
        .call()
        .with_context(|| format!("downloading '{}'", url))?;

    let mut file = fs::File::create(dest)
        .with_context(|| format!("creating '{}'", dest.display()))?;
    std::io::copy(&mut response.into_body().as_reader(), &mut file)
        .with_context(|| format!("writing '{}'", dest.display()))?;
    Ok(())
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(DOWNLOAD_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

fn verify_sha256(path: &Path, expected: &str) -> Result<()> {
    let bytes = fs::read(path)?;
    let actual = {
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        format!("{:x}", hasher.finalize())
    };

    if !actual.eq_ignore_ascii_case(expected) {
        bail!(
            "busybox checksum mismatch for {}:\n  expected {}\n  got      {}",
            path.display(),
            expected,
            actual
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_with_stash(stash: &Path) -> Config {
        Config {
            kernel_src: PathBuf::from("linux"),
            stash_dir: stash.to_path_buf(),
            qemu_binary: "qemu-system-x86_64".to_string(),
            make_flags: vec![],
            busybox_version: "1.36.1".to_string(),
            busybox_sha256: None,
            module_filter: "rust".to_string(),
        }
    }

    #[test]
    fn test_cache_hit_skips_download() {
        let temp = TempDir::new().unwrap();
        let config = config_with_stash(temp.path());

        let cached = cached_path(temp.path(), "1.36.1");
        fs::write(&cached, b"fake busybox").unwrap();

        // No network: an existing file must be returned as-is.
        let got = ensure_busybox(&config).unwrap();
        assert_eq!(got, cached);
        assert_eq!(fs::read(&got).unwrap(), b"fake busybox");
    }

    #[test]
    fn test_cached_path_carries_version() {
        let path = cached_path(Path::new("/stash"), "1.36.1");
        assert_eq!(path, PathBuf::from("/stash/busybox-1.36.1"));
    }

    #[test]
    fn test_verify_sha256() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("blob");
        fs::write(&file, b"hello").unwrap();

        // sha256("hello")
        let good = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        verify_sha256(&file, good).unwrap();
        verify_sha256(&file, &good.to_uppercase()).unwrap();
        assert!(verify_sha256(&file, "00").is_err());
    }

    #[test]
    fn test_download_url_shape() {
        let url = download_url("1.36.1");
        assert!(url.starts_with("https://busybox.net/"));
        assert!(url.contains("1.36.1"));
        assert!(url.ends_with("busybox-x86_64"));
    }
}
