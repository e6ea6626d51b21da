//! Recorded process tables.
//!
//! A [`Snapshot`] freezes what a [`ProcessInfoProvider`] reported at one point in time, so a
//! tree can be rendered again later, on another machine, or from a hand-written fixture.

use crate::{Pid, ProcessInfoProvider, ProviderError, VanishedPolicy};
use anyhow::{Context, Result};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub processes: Vec<ProcessEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pid: Pid,
    pub name: String,
    /// Main thread first
    #[serde(default)]
    pub threads: Vec<ThreadEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub tid: Pid,
    /// Defaults to the name of the owning process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Pid>,
}

impl ProcessEntry {
    pub fn new<S: Into<String>>(pid: Pid, name: S) -> Self {
        Self {
            pid,
            name: name.into(),
            threads: Vec::new(),
        }
    }

    /// Append a thread that shares the process name.
    pub fn thread<I: IntoIterator<Item = Pid>>(mut self, tid: Pid, children: I) -> Self {
        self.threads.push(ThreadEntry {
            tid,
            name: None,
            children: children.into_iter().collect(),
        });
        self
    }

    pub fn named_thread<S: Into<String>, I: IntoIterator<Item = Pid>>(
        mut self,
        tid: Pid,
        name: S,
        children: I,
    ) -> Self {
        self.threads.push(ThreadEntry {
            tid,
            name: Some(name.into()),
            children: children.into_iter().collect(),
        });
        self
    }

    fn find_thread(&self, tid: Pid) -> Option<&ThreadEntry> {
        self.threads.iter().find(|thread| thread.tid == tid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

impl Snapshot {
    pub fn with_process(mut self, process: ProcessEntry) -> Self {
        self.processes.push(process);
        self
    }

    fn find(&self, pid: Pid) -> Option<&ProcessEntry> {
        self.processes.iter().find(|process| process.pid == pid)
    }

    /// Record every process reachable from `root`, following the children of all threads.
    ///
    /// Under [`VanishedPolicy::Skip`], processes that exit during the walk are left out and
    /// dropped from their parent's children, so the recording stays self-consistent. A process
    /// whose threads vanish after its name was read is kept as a leaf.
    pub fn capture<P: ProcessInfoProvider + ?Sized>(
        provider: &P,
        root: Pid,
        vanished: VanishedPolicy,
    ) -> Result<Self, ProviderError> {
        let mut processes = HashMap::new();
        let mut seen = HashSet::from([root]);
        let mut pending = vec![root];

        while let Some(pid) = pending.pop() {
            let name = if pid == root {
                provider.name(pid)?
            } else {
                match vanished.tolerate(provider.name(pid))? {
                    Some(name) => name,
                    None => continue,
                }
            };
            let mut entry = ProcessEntry::new(pid, name);

            let Some(threads) = vanished.tolerate(provider.threads(pid))? else {
                processes.insert(pid, entry.thread(pid, []));
                continue;
            };
            for tid in threads {
                let thread_name = if tid == pid {
                    None
                } else {
                    match vanished.tolerate(provider.name(tid))? {
                        Some(thread_name) => Some(thread_name).filter(|n| *n != entry.name),
                        None => continue,
                    }
                };
                let children = vanished
                    .tolerate(provider.children(pid, tid))?
                    .unwrap_or_default();
                pending.extend(children.iter().filter(|child| seen.insert(**child)));
                entry.threads.push(ThreadEntry {
                    tid,
                    name: thread_name,
                    children,
                });
            }

            processes.insert(pid, entry);
        }

        let recorded: HashSet<Pid> = processes.keys().copied().collect();
        for thread in processes.values_mut().flat_map(|process| &mut process.threads) {
            thread.children.retain(|child| recorded.contains(child));
        }

        debug!("Captured {} processes from root {root}", processes.len());
        Ok(Snapshot {
            processes: processes
                .into_values()
                .sorted_by_key(|process| process.pid)
                .collect(),
        })
    }

    /// Load a snapshot, as JSON when the file ends in `.json` and as YAML otherwise.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read snapshot at {}", path.display()))?;

        let snapshot = match Format::of(path) {
            Format::Json => serde_json::from_slice(&content).map_err(anyhow::Error::from),
            Format::Yaml => serde_yaml::from_slice(&content).map_err(anyhow::Error::from),
        }
        .with_context(|| format!("Failed to parse snapshot at {}", path.display()))?;

        debug!("Snapshot loaded from {}", path.display());
        Ok(snapshot)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = match Format::of(path) {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Yaml => serde_yaml::to_string(self)?,
        };
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;

        debug!("Snapshot saved to {}", path.display());
        Ok(())
    }
}

impl ProcessInfoProvider for Snapshot {
    fn name(&self, pid: Pid) -> Result<String, ProviderError> {
        if let Some(process) = self.find(pid) {
            return Ok(process.name.clone());
        }

        // Threads are addressable by tid too
        self.processes
            .iter()
            .find_map(|process| {
                process
                    .find_thread(pid)
                    .map(|thread| thread.name.as_ref().unwrap_or(&process.name).clone())
            })
            .ok_or(ProviderError::NotFound { pid })
    }

    fn threads(&self, pid: Pid) -> Result<Vec<Pid>, ProviderError> {
        let process = self.find(pid).ok_or(ProviderError::NotFound { pid })?;
        Ok(process.threads.iter().map(|thread| thread.tid).collect())
    }

    fn children(&self, pid: Pid, tid: Pid) -> Result<Vec<Pid>, ProviderError> {
        let process = self.find(pid).ok_or(ProviderError::NotFound { pid })?;
        let thread = process
            .find_thread(tid)
            .ok_or(ProviderError::NotFound { pid: tid })?;
        Ok(thread.children.clone())
    }

    fn lowest_pid(&self) -> Result<Pid, ProviderError> {
        self.processes
            .iter()
            .map(|process| process.pid)
            .min()
            .ok_or(ProviderError::Empty)
    }
}
