//! Server settings, with defaults for every field and an optional JSON5 file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default port the file server listens on
pub const DEFAULT_PORT: u16 = 8080;

/// Default quiet period before a burst of file changes triggers a reload
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Directory names that are never watched: version control, dependency cache, vendored code
pub const DEFAULT_EXCLUDED_DIRS: [&str; 3] = [".git", "node_modules", "vendor"];

/// Server configuration structure
///
/// Every field has a default, so a configuration file only needs to name the
/// values it wants to change.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to
    pub port: u16,
    /// Whether file watching and live reload are enabled
    pub watch: bool,
    /// Directory to serve files from
    pub dir: PathBuf,
    /// Quiet period, in milliseconds, that must pass before clients are told to reload
    pub debounce_ms: u64,
    /// Directory names whose subtrees are skipped by the watcher
    pub excluded_dirs: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            watch: true,
            dir: PathBuf::from("."),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            excluded_dirs: DEFAULT_EXCLUDED_DIRS
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        }
    }
}

impl ServerConfig {
    /// Load the server configuration from a JSON5 file.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        tracing::debug!("Loading server configuration from {}", path.display());
        let config_str = fs::read_to_string(path)?;
        let config: ServerConfig = json5::from_str(&config_str)?;

        tracing::info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Absolute path of the directory being served and watched.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined
    pub fn root(&self) -> crate::error::Result<PathBuf> {
        if self.dir.is_absolute() {
            return Ok(self.dir.clone());
        }
        let cwd = std::env::current_dir()?;
        Ok(normalize(&cwd.join(&self.dir)))
    }
}

/// Collapse `.` and `..` components without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
