use crate::Pid;

pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The process or thread exited, or never existed.
    #[error("process {pid} not found")]
    NotFound { pid: Pid },

    #[error("failed to read metadata of process {pid}")]
    Read {
        pid: Pid,
        #[source]
        source: BoxedSource,
    },

    #[error("failed to list processes")]
    List {
        #[source]
        source: BoxedSource,
    },

    #[error("no process available")]
    Empty,
}

impl ProviderError {
    pub fn read(pid: Pid, source: impl Into<BoxedSource>) -> Self {
        ProviderError::Read {
            pid,
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }
}
