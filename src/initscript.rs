//! Boot-time init script synthesis.
//!
//! The generated script runs as PID 1 inside the assembled initramfs. It
//! load/unload-cycles every discovered module as a smoke test, installs a
//! wrapper in /bin for every busybox applet, prints a banner, and finally
//! execs an interactive shell.
//!
//! The applet list is queried from `busybox --list` at boot, not baked in
//! here: whatever busybox build ends up in the image decides its own
//! command set.
//!
//! Generation is a pure function of the artifact set: equal inputs yield
//! byte-identical scripts. The terminal `exec` lives in its own field and
//! is always rendered last, so nothing can be sequenced after the point
//! where the process image is replaced.

use crate::locate::ModuleArtifact;

/// Shebang plus the blank line that separates it from the body.
const HEADER: &str = "#!/bin/sh\n";

/// Fixed trailer: applet wrappers and the boot banner.
///
/// The wrapper written per applet is two lines, shebang plus an exec that
/// forwards arguments (and stdin, inherited) to busybox under the applet
/// name. Already-installed names are left alone.
const TRAILER: &str = r#"
for applet in $(/bin/busybox --list); do
	if [ ! -e "/bin/$applet" ]; then
		/bin/busybox printf '#!/bin/sh\nexec /bin/busybox %s "$@"\n' "$applet" > "/bin/$applet"
		/bin/busybox chmod 0755 "/bin/$applet"
	fi
done

echo
echo "Booted kernel $(/bin/busybox uname -r)"
echo "Module objects are at /*.ko; press Ctrl-A then X to leave QEMU."
echo
"#;

/// An init script: header, module smoke-test statements, trailer, and a
/// terminal process-replacement statement nothing can follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitScript {
    statements: Vec<String>,
    final_exec: String,
}

impl InitScript {
    /// Render the script text. The exec statement is always the last line.
    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for statement in &self.statements {
            out.push_str(statement);
            out.push('\n');
        }
        out.push_str(TRAILER);
        out.push_str(&self.final_exec);
        out.push('\n');
        out
    }

    /// Number of module load/unload statements (2 per artifact).
    pub fn smoke_test_statements(&self) -> usize {
        self.statements.len()
    }
}

/// Generate the init script for an artifact set.
///
/// Modules are inserted and removed at their flattened image paths, in
/// the same order the manifest packed them.
pub fn generate(artifacts: &[ModuleArtifact]) -> InitScript {
    let mut statements = Vec::with_capacity(artifacts.len() * 2);
    for artifact in artifacts {
        statements.push(format!("busybox insmod /{}", artifact.file_name));
        statements.push(format!("busybox rmmod /{}", artifact.file_name));
    }

    InitScript {
        statements,
        final_exec: "exec /bin/sh".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn artifact(path: &str) -> ModuleArtifact {
        let path = PathBuf::from(path);
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        ModuleArtifact { path, file_name }
    }

    #[test]
    fn test_starts_with_shebang_and_blank_line() {
        let script = generate(&[]).render();
        assert!(script.starts_with("#!/bin/sh\n\n"));
    }

    #[test]
    fn test_load_unload_pair_per_module_in_order() {
        let artifacts = vec![artifact("a/rust_foo.ko"), artifact("b/rust_bar.ko")];
        let script = generate(&artifacts);
        assert_eq!(script.smoke_test_statements(), 4);

        let text = script.render();
        let foo_ins = text.find("busybox insmod /rust_foo.ko").unwrap();
        let foo_rm = text.find("busybox rmmod /rust_foo.ko").unwrap();
        let bar_ins = text.find("busybox insmod /rust_bar.ko").unwrap();
        let bar_rm = text.find("busybox rmmod /rust_bar.ko").unwrap();
        assert!(foo_ins < foo_rm);
        assert!(foo_rm < bar_ins);
        assert!(bar_ins < bar_rm);
    }

    #[test]
    fn test_generation_is_pure() {
        let artifacts = vec![artifact("a/rust_foo.ko"), artifact("b/rust_bar.ko")];
        assert_eq!(generate(&artifacts).render(), generate(&artifacts).render());
    }

    #[test]
    fn test_exec_is_the_final_statement() {
        let artifacts = vec![artifact("a/rust_foo.ko")];
        let text = generate(&artifacts).render();
        assert_eq!(text.lines().last(), Some("exec /bin/sh"));
    }

    #[test]
    fn test_applet_list_is_queried_at_boot() {
        let text = generate(&[]).render();
        // The wrapper loop must iterate runtime `busybox --list` output,
        // not a list expanded at generation time.
        assert!(text.contains("for applet in $(/bin/busybox --list)"));
        assert!(text.contains(r#"[ ! -e "/bin/$applet" ]"#));
        assert!(text.contains("chmod 0755"));
    }

    #[test]
    fn test_banner_names_detach_keys_and_module_glob() {
        let text = generate(&[]).render();
        assert!(text.contains("uname -r"));
        assert!(text.contains("Ctrl-A then X"));
        assert!(text.contains("/*.ko"));
    }
}
