use procinfo::Pid;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Process,
    Thread,
    /// Several non-main threads collapsed into one line
    Threads(usize),
}

/// One line of output, without its connector prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    name: String,
    pid: Option<Pid>,
    kind: Kind,
}

impl Line {
    pub fn process(name: String, pid: Option<Pid>) -> Self {
        Self {
            name,
            pid,
            kind: Kind::Process,
        }
    }

    pub fn thread(name: String, tid: Option<Pid>) -> Self {
        Self {
            name,
            pid: tid,
            kind: Kind::Thread,
        }
    }

    /// Stand-in for `count` threads sharing `name`. Never carries a pid.
    pub fn merged_threads(name: String, count: usize) -> Self {
        let kind = if count > 1 {
            Kind::Threads(count)
        } else {
            Kind::Thread
        };
        Self {
            name,
            pid: None,
            kind,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Process => write!(f, "{}", self.name)?,
            Kind::Thread => write!(f, "{{{}}}", self.name)?,
            Kind::Threads(count) => write!(f, "{count}*[{{{}}}]", self.name)?,
        }
        if let Some(pid) = self.pid {
            write!(f, "({pid})")?;
        }
        Ok(())
    }
}
