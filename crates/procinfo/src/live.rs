use crate::{Pid, ProcessInfoProvider, ProviderError};
use log::trace;
use procfs::ProcError;
use procfs::process::Process;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Reads process metadata from a procfs mount.
///
/// Names come from `<root>/<pid>/stat`, threads from `<root>/<pid>/task` and children from
/// `<root>/<pid>/task/<tid>/children`. The latter only exists on kernels built with
/// `CONFIG_PROC_CHILDREN`.
#[derive(Debug, Clone)]
pub struct ProcfsProvider {
    root: PathBuf,
}

impl Default for ProcfsProvider {
    fn default() -> Self {
        Self::with_root(DEFAULT_PROC_ROOT)
    }
}

impl ProcfsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn process(&self, pid: Pid) -> Result<Process, ProviderError> {
        Process::new_with_root(self.root.join(pid.to_string())).map_err(|err| convert(pid, err))
    }
}

fn convert(pid: Pid, err: ProcError) -> ProviderError {
    match err {
        ProcError::NotFound(_) => ProviderError::NotFound { pid },
        other => ProviderError::read(pid, other),
    }
}

impl ProcessInfoProvider for ProcfsProvider {
    fn name(&self, pid: Pid) -> Result<String, ProviderError> {
        let stat = self.process(pid)?.stat().map_err(|err| convert(pid, err))?;
        trace!("Read name of {pid}: {:?}", stat.comm);
        Ok(stat.comm.trim_end_matches('\n').to_owned())
    }

    fn threads(&self, pid: Pid) -> Result<Vec<Pid>, ProviderError> {
        let tasks = self.process(pid)?.tasks().map_err(|err| convert(pid, err))?;

        let mut tids = Vec::new();
        for task in tasks {
            match task {
                Ok(task) => tids.push(task.tid),
                // The thread exited between the directory listing and its opening
                Err(ProcError::NotFound(path)) => trace!("Skipping vanished task {path:?}"),
                Err(err) => return Err(convert(pid, err)),
            }
        }
        trace!("Read threads of {pid}: {tids:?}");
        Ok(tids)
    }

    fn children(&self, pid: Pid, tid: Pid) -> Result<Vec<Pid>, ProviderError> {
        let task = self
            .process(pid)?
            .task_from_tid(tid)
            .map_err(|err| convert(tid, err))?;
        let children = task
            .children()
            .map_err(|err| convert(tid, err))?
            .into_iter()
            .map(|child| child as Pid)
            .collect::<Vec<_>>();
        trace!("Read children of {pid}/{tid}: {children:?}");
        Ok(children)
    }

    fn lowest_pid(&self) -> Result<Pid, ProviderError> {
        let processes = procfs::process::all_processes_with_root(&self.root)
            .map_err(|err| ProviderError::List {
                source: err.into(),
            })?;

        processes
            .filter_map(Result::ok)
            .map(|process| process.pid())
            .min()
            .ok_or(ProviderError::Empty)
    }
}
