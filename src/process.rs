//! Thin wrappers around external process invocation.
//!
//! Every external step in the pipeline (make, gen_init_cpio, qemu, gdb) is
//! a blocking call; a non-zero exit aborts the run with the remediation
//! message attached via `error_msg`.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Builder for external commands with an attached failure message.
pub struct Cmd {
    inner: Command,
    program: String,
    error_msg: Option<String>,
}

impl Cmd {
    pub fn new(program: &str) -> Self {
        Self {
            inner: Command::new(program),
            program: program.to_string(),
            error_msg: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<std::ffi::OsStr>) -> Self {
        self.inner.arg(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.inner.args(args);
        self
    }

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.inner.arg(path);
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.inner.current_dir(dir);
        self
    }

    /// Message shown when the command fails, typically naming the fix.
    pub fn error_msg(mut self, msg: &str) -> Self {
        self.error_msg = Some(msg.to_string());
        self
    }

    /// Run with captured output; surface stderr on failure.
    pub fn run(mut self) -> Result<()> {
        let output = self
            .inner
            .output()
            .with_context(|| format!("failed to spawn '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let msg = self
                .error_msg
                .unwrap_or_else(|| format!("'{}' failed", self.program));
            bail!("{} (status {}):\n{}", msg, output.status, stderr.trim());
        }
        Ok(())
    }

    /// Run with inherited stdio so the operator sees progress live.
    pub fn run_interactive(mut self) -> Result<()> {
        let status = self
            .inner
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to spawn '{}'", self.program))?;

        if !status.success() {
            let msg = self
                .error_msg
                .unwrap_or_else(|| format!("'{}' failed", self.program));
            bail!("{} (status {})", msg, status);
        }
        Ok(())
    }
}

/// Run a shell pipeline via `sh -c`.
pub fn shell(cmd: &str) -> Result<()> {
    let status = Command::new("sh")
        .args(["-c", cmd])
        .status()
        .with_context(|| format!("failed to spawn shell for: {}", cmd))?;

    if !status.success() {
        bail!("shell command failed (status {}): {}", status, cmd);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_success() {
        Cmd::new("true").run().unwrap();
    }

    #[test]
    fn test_run_failure_includes_error_msg() {
        let err = Cmd::new("false")
            .error_msg("expected failure")
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("expected failure"));
    }

    #[test]
    fn test_run_missing_binary() {
        let result = Cmd::new("definitely_not_a_real_command_12345").run();
        assert!(result.is_err());
    }

    #[test]
    fn test_shell_pipeline() {
        shell("echo hi | grep -q hi").unwrap();
        assert!(shell("echo hi | grep -q bye").is_err());
    }
}
