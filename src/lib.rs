//! Print the live process tree of a host, with merged or per-thread lines.

mod prelude;

pub mod app;
pub mod config;
pub mod logger;
pub mod tree;

pub use config::{OutputStream, PstreeConfig};
pub use tree::{RenderConfig, RenderError, render, render_to_string};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
