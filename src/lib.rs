//! Build-and-boot harness for out-of-tree kernel module development.
//!
//! modboot compiles a kernel, assembles a throwaway initramfs around the
//! compiled `.ko` artifacts, and boots the result under QEMU for
//! interactive poking. The interesting part is the initramfs pipeline:
//!
//! ```text
//! locate ─────► ModuleArtifact set
//!                │
//!      ┌────────┴────────┐
//!      ▼                 ▼
//!  manifest          initscript
//!  (gen_init_cpio    (insmod/rmmod smoke test,
//!   description)      applet wrappers, exec sh)
//!      │                 │
//!      └────────┬────────┘
//!               ▼
//!            image (gen_init_cpio | gzip)
//!               ▼
//!            qemu (boot, optional gdb stub)
//! ```
//!
//! Everything runs sequentially; external tools (make, gen_init_cpio,
//! qemu, gdb) are opaque blocking calls and any non-zero exit aborts the
//! run. Failures inside the generated init script happen in the guest and
//! only show up on the serial console.

pub mod build;
pub mod busybox;
pub mod config;
pub mod image;
pub mod initscript;
pub mod locate;
pub mod manifest;
pub mod preflight;
pub mod process;
pub mod qemu;

pub use config::Config;
pub use locate::ModuleArtifact;
