//! Process metadata sources for the process tree renderer.
//!
//! A [`ProcessInfoProvider`] answers three questions about a process: its name, its threads and
//! the children each thread spawned. [`ProcfsProvider`] reads them from a live procfs mount,
//! [`Snapshot`] from a recorded process table.

mod error;
#[cfg(target_os = "linux")]
mod live;
mod provider;
pub mod snapshot;

pub use error::ProviderError;
#[cfg(target_os = "linux")]
pub use live::{DEFAULT_PROC_ROOT, ProcfsProvider};
pub use provider::{ProcessInfoProvider, VanishedPolicy};
pub use snapshot::{ProcessEntry, Snapshot, ThreadEntry};

/// Kernel-assigned process or thread identifier.
pub type Pid = libc::pid_t;
