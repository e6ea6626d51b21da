//! Process tree traversal and rendering.
//!
//! The tree is never materialized: each process is fetched from the provider, its line written,
//! and its children visited depth-first before moving on to its next sibling.

mod connectors;
mod line;

pub use connectors::{Connectors, Glyphs};
pub use line::Line;

use crate::prelude::*;
use procinfo::{Pid, ProcessInfoProvider, ProviderError};
use std::io::Write;

pub use procinfo::VanishedPolicy;

pub const DEFAULT_MAX_DEPTH: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Print pids, and one line per thread instead of a merged one
    pub show_pids: bool,
    /// Visit children by ascending pid instead of discovery order
    pub numeric_sort: bool,
    pub glyphs: Glyphs,
    /// Deepest process level below the root that may be drawn
    pub max_depth: usize,
    pub vanished: VanishedPolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_pids: false,
            numeric_sort: false,
            glyphs: Glyphs::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            vanished: VanishedPolicy::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("process {pid} reports no threads")]
    NoThreads { pid: Pid },

    #[error("process {pid} is nested deeper than the maximum depth of {max_depth}")]
    DepthExceeded { pid: Pid, max_depth: usize },

    #[error("failed to write the process tree")]
    Write(#[from] std::io::Error),
}

/// Write the tree rooted at `root` to `out`, one line per process or thread group.
///
/// The first failure aborts the whole rendering: lines already written stay written, but the
/// tree is incomplete.
pub fn render<P, W>(
    provider: &P,
    root: Pid,
    config: &RenderConfig,
    out: W,
) -> Result<(), RenderError>
where
    P: ProcessInfoProvider + ?Sized,
    W: Write,
{
    let name = provider.name(root)?;
    let mut renderer = TreeRenderer {
        provider,
        config,
        out,
    };
    renderer.visit(root, name, &Connectors::root())?;
    renderer.out.flush()?;
    Ok(())
}

/// Render into a string, mostly useful for tests and snapshots.
pub fn render_to_string<P>(
    provider: &P,
    root: Pid,
    config: &RenderConfig,
) -> Result<String, RenderError>
where
    P: ProcessInfoProvider + ?Sized,
{
    let mut buffer = Vec::new();
    render(provider, root, config, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

struct TreeRenderer<'a, P: ?Sized, W> {
    provider: &'a P,
    config: &'a RenderConfig,
    out: W,
}

impl<P, W> TreeRenderer<'_, P, W>
where
    P: ProcessInfoProvider + ?Sized,
    W: Write,
{
    fn visit(
        &mut self,
        pid: Pid,
        name: String,
        connectors: &Connectors,
    ) -> Result<(), RenderError> {
        if connectors.depth() > self.config.max_depth {
            return Err(RenderError::DepthExceeded {
                pid,
                max_depth: self.config.max_depth,
            });
        }

        let shown_pid = self.config.show_pids.then_some(pid);
        self.emit(connectors, &Line::process(name, shown_pid))?;

        let Some(threads) = self.tolerate(self.provider.threads(pid))? else {
            // Exited right after its line was drawn, keep it as a leaf
            return Ok(());
        };
        let Some((_main, extra)) = threads.split_first() else {
            return Err(RenderError::NoThreads { pid });
        };

        let children = self.children(pid, &threads)?;
        let thread_lines = self.thread_lines(extra)?;
        debug!(
            "Visiting {pid} at depth {}: {} threads, {} children",
            connectors.depth(),
            threads.len(),
            children.len()
        );

        // Thread lines come first, so only the last child can close the level, or the last
        // thread line when there are no children.
        let mut remaining = thread_lines.len() + children.len();
        for line in &thread_lines {
            remaining -= 1;
            self.emit(&connectors.descend(remaining == 0), line)?;
        }
        for (child, child_name) in children {
            remaining -= 1;
            self.visit(child, child_name, &connectors.descend(remaining == 0))?;
        }

        Ok(())
    }

    /// Children of all threads, concatenated in thread order, along with their names.
    fn children(&self, pid: Pid, threads: &[Pid]) -> Result<Vec<(Pid, String)>, RenderError> {
        let mut children = Vec::new();
        for &tid in threads {
            if let Some(found) = self.tolerate(self.provider.children(pid, tid))? {
                children.extend(found);
            }
        }

        if self.config.numeric_sort {
            children.sort_unstable();
        }

        let mut named = Vec::with_capacity(children.len());
        for child in children {
            if let Some(name) = self.tolerate(self.provider.name(child))? {
                named.push((child, name));
            }
        }
        Ok(named)
    }

    fn thread_lines(&self, extra: &[Pid]) -> Result<Vec<Line>, RenderError> {
        if extra.is_empty() {
            return Ok(Vec::new());
        }

        if self.config.show_pids {
            let mut lines = Vec::with_capacity(extra.len());
            for &tid in extra {
                if let Some(name) = self.tolerate(self.provider.name(tid))? {
                    lines.push(Line::thread(name, Some(tid)));
                }
            }
            return Ok(lines);
        }

        // All threads share the process image, any of them names the group
        for &tid in extra {
            if let Some(name) = self.tolerate(self.provider.name(tid))? {
                return Ok(vec![Line::merged_threads(name, extra.len())]);
            }
        }
        Ok(Vec::new())
    }

    fn tolerate<T>(&self, result: Result<T, ProviderError>) -> Result<Option<T>, RenderError> {
        Ok(self.config.vanished.tolerate(result)?)
    }

    fn emit(&mut self, connectors: &Connectors, line: &Line) -> Result<(), RenderError> {
        writeln!(self.out, "{}{line}", connectors.prefix(self.config.glyphs))?;
        Ok(())
    }
}
