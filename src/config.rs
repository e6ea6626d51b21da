use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::prelude::*;
use crate::tree::{DEFAULT_MAX_DEPTH, Glyphs, RenderConfig, VanishedPolicy};
use nestify::nest;
use serde::{Deserialize, Serialize};

/// Stream the tree is printed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    #[default]
    Stdout,
    Stderr,
}

nest! {
    #[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]*
    #[serde(rename_all = "kebab-case", default)]*
    /// Persistent defaults for pstree.
    ///
    /// Read from `~/.config/pstree/config.yaml` (or `$XDG_CONFIG_HOME/pstree/config.yaml`), every
    /// key is optional. Command line flags are applied on top of it.
    ///
    /// ```yaml
    /// display:
    ///   show-pids: true
    ///   output: stderr
    /// scan:
    ///   max-depth: 64
    /// ```
    pub struct PstreeConfig {
        pub display: pub struct DisplayConfig {
            pub show_pids: bool,
            pub numeric_sort: bool,
            pub ascii: bool,
            pub output: OutputStream,
        },
        pub scan: pub struct ScanConfig {
            pub max_depth: Option<usize>,
            pub skip_vanished: bool,
            pub proc_root: Option<PathBuf>,
        },
    }
}

/// Get the path to the configuration file, following the XDG Base Directory Specification.
///
/// Returns None when neither XDG_CONFIG_HOME nor HOME is set.
fn get_configuration_file_path() -> Option<PathBuf> {
    let config_dir = env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;

    Some(config_dir.join("pstree").join("config.yaml"))
}

impl PstreeConfig {
    /// Load the configuration. If the default file does not exist, return a default configuration.
    ///
    /// An explicit `path_override` must exist.
    pub fn load(path_override: Option<&Path>) -> Result<Self> {
        let (config_path, required) = match path_override {
            Some(path) => {
                let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
                (PathBuf::from(expanded), true)
            }
            None => match get_configuration_file_path() {
                Some(path) => (path, false),
                None => {
                    debug!("No home directory, using the default configuration");
                    return Ok(Self::default());
                }
            },
        };

        match fs::read(&config_path) {
            Ok(content) if content.iter().all(u8::is_ascii_whitespace) => {
                debug!("Config file at {} is empty", config_path.display());
                Ok(Self::default())
            }
            Ok(content) => {
                let config: PstreeConfig = serde_yaml::from_slice(&content).with_context(|| {
                    format!("Failed to parse pstree config at {}", config_path.display())
                })?;
                debug!("Config loaded from {}", config_path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                debug!("Config file not found at {}", config_path.display());
                Ok(Self::default())
            }
            Err(e) => bail!("Failed to load config at {}: {e}", config_path.display()),
        }
    }
}

impl From<&PstreeConfig> for RenderConfig {
    fn from(config: &PstreeConfig) -> Self {
        RenderConfig {
            show_pids: config.display.show_pids,
            numeric_sort: config.display.numeric_sort,
            glyphs: if config.display.ascii {
                Glyphs::Ascii
            } else {
                Glyphs::Unicode
            },
            max_depth: config.scan.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            vanished: if config.scan.skip_vanished {
                VanishedPolicy::Skip
            } else {
                VanishedPolicy::Abort
            },
        }
    }
}
