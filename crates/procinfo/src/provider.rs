use crate::{Pid, ProviderError};
use log::warn;

/// What to do with a process or thread that exits while the tree is being walked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VanishedPolicy {
    #[default]
    Abort,
    /// Leave it out of the tree and keep going
    Skip,
}

impl VanishedPolicy {
    /// Turn a vanished process into `None` when the policy allows it.
    pub fn tolerate<T>(self, result: Result<T, ProviderError>) -> Result<Option<T>, ProviderError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() && self == VanishedPolicy::Skip => {
                warn!("Skipping vanished process: {err}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// Source of per-process metadata, keyed by pid.
///
/// Every answer is read at call time; implementations keep no consistency guarantee between
/// two calls, a process may exit in between.
pub trait ProcessInfoProvider {
    /// Display name of a process or thread, without trailing newline.
    fn name(&self, pid: Pid) -> Result<String, ProviderError>;

    /// Thread ids of a process, main thread first.
    fn threads(&self, pid: Pid) -> Result<Vec<Pid>, ProviderError>;

    /// Children spawned by the thread `tid` of process `pid`, in spawn order.
    fn children(&self, pid: Pid, tid: Pid) -> Result<Vec<Pid>, ProviderError>;

    /// Lowest live pid, conventionally the init process.
    fn lowest_pid(&self) -> Result<Pid, ProviderError>;
}

impl<P: ProcessInfoProvider + ?Sized> ProcessInfoProvider for &P {
    fn name(&self, pid: Pid) -> Result<String, ProviderError> {
        (**self).name(pid)
    }

    fn threads(&self, pid: Pid) -> Result<Vec<Pid>, ProviderError> {
        (**self).threads(pid)
    }

    fn children(&self, pid: Pid, tid: Pid) -> Result<Vec<Pid>, ProviderError> {
        (**self).children(pid, tid)
    }

    fn lowest_pid(&self) -> Result<Pid, ProviderError> {
        (**self).lowest_pid()
    }
}

impl<P: ProcessInfoProvider + ?Sized> ProcessInfoProvider for Box<P> {
    fn name(&self, pid: Pid) -> Result<String, ProviderError> {
        (**self).name(pid)
    }

    fn threads(&self, pid: Pid) -> Result<Vec<Pid>, ProviderError> {
        (**self).threads(pid)
    }

    fn children(&self, pid: Pid, tid: Pid) -> Result<Vec<Pid>, ProviderError> {
        (**self).children(pid, tid)
    }

    fn lowest_pid(&self) -> Result<Pid, ProviderError> {
        (**self).lowest_pid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerate() {
        let gone = || Err::<(), _>(ProviderError::NotFound { pid: 7 });

        assert_eq!(VanishedPolicy::Skip.tolerate(Ok(3)).unwrap(), Some(3));
        assert_eq!(VanishedPolicy::Skip.tolerate(gone()).unwrap(), None);
        assert!(matches!(
            VanishedPolicy::Abort.tolerate(gone()),
            Err(ProviderError::NotFound { pid: 7 })
        ));
        assert!(matches!(
            VanishedPolicy::Skip.tolerate::<()>(Err(ProviderError::Empty)),
            Err(ProviderError::Empty)
        ));
    }
}
