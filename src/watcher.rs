//! Filesystem watcher that turns bursts of edits into single change notifications.
//!
//! Every directory under the root is registered with the OS notification
//! backend on its own, which lets dependency and version-control subtrees be
//! skipped entirely. Events for hidden, backup, and swap files are dropped,
//! and qualifying events feed a [`Debouncer`] so a burst of writes produces
//! one notification.

use crate::debounce::Debouncer;
use crate::error::Result;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Recursive directory watcher with filtering and debouncing
pub struct ChangeWatcher {
    root: PathBuf,
    excluded_dirs: Vec<String>,
    watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    watched: HashSet<PathBuf>,
    debouncer: Debouncer,
}

impl ChangeWatcher {
    /// Create the watcher and register every directory under `root`.
    ///
    /// Directories that cannot be read or watched are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS notification backend cannot be created
    pub fn new(root: PathBuf, excluded_dirs: Vec<String>, quiet: Duration) -> Result<Self> {
        // Unbounded: the backend thread must never wait on the event loop,
        // which itself waits on that thread while registering new directories.
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The receiver only goes away when the watcher is being torn down.
            let _ = tx.send(res);
        })?;

        let mut change_watcher = Self {
            root: root.clone(),
            excluded_dirs,
            watcher,
            events: rx,
            watched: HashSet::new(),
            debouncer: Debouncer::new(quiet),
        };

        let count = change_watcher.watch_tree(&root);
        info!("Watching {count} directories under {}", root.display());

        Ok(change_watcher)
    }

    /// Root directory of the watched tree
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories currently registered with the notification backend
    #[must_use]
    pub fn watched_dirs(&self) -> &HashSet<PathBuf> {
        &self.watched
    }

    /// Process events until the event channel closes.
    ///
    /// `on_change` is called once per settled burst of qualifying events.
    /// Errors reported by the backend are logged and the loop keeps going.
    pub async fn run<F, Fut>(mut self, on_change: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        info!("Watching for changes in: {}", self.root.display());

        loop {
            let Some(res) = self.events.recv().await else {
                break;
            };
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    error!("Watcher error: {e}");
                    continue;
                }
            };
            if !is_change_kind(&event.kind) {
                continue;
            }

            // Directory checks and registration hit the filesystem.
            let task = tokio::task::spawn_blocking(move || {
                let changed = self.handle_event(&event);
                (self, changed)
            });
            match task.await {
                Ok((watcher, changed)) => {
                    self = watcher;
                    if changed {
                        self.debouncer.schedule(on_change());
                    }
                }
                Err(e) => {
                    error!("Watcher event task failed: {e}");
                    return;
                }
            }
        }

        debug!("Watcher event channel closed");
    }

    /// Decide whether `event` counts as a change, registering new directories on the way.
    pub fn handle_event(&mut self, event: &Event) -> bool {
        if !is_change_kind(&event.kind) {
            return false;
        }

        let mut changed = false;
        for path in &event.paths {
            if is_noise(path) || is_excluded(path, &self.root, &self.excluded_dirs) {
                continue;
            }

            if path.is_dir() && !self.watched.contains(path) {
                let count = self.watch_tree(path);
                debug!("Started watching {count} new directories under {}", path.display());
            }

            info!("File changed: {}", path.display());
            changed = true;
        }
        changed
    }

    /// Register `dir` and every non-excluded directory below it. Returns how many were added.
    fn watch_tree(&mut self, dir: &Path) -> usize {
        let root = &self.root;
        let excluded_dirs = &self.excluded_dirs;
        let walker = WalkDir::new(dir).into_iter().filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return false;
            }
            if is_excluded(entry.path(), root, excluded_dirs) {
                debug!("Skipping excluded directory: {}", entry.path().display());
                return false;
            }
            true
        });

        let mut added = 0;
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error walking directory: {e}");
                    continue;
                }
            };

            let path = entry.path();
            if self.watched.contains(path) {
                continue;
            }
            match self.watcher.watch(path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    self.watched.insert(path.to_path_buf());
                    added += 1;
                }
                Err(e) => warn!("Couldn't watch {}: {e}", path.display()),
            }
        }

        added
    }
}

/// Whether the event kind is a write or a create.
///
/// A rename onto a watched path counts as a create, since editors often save
/// by writing a temporary file and moving it into place.
#[must_use]
pub fn is_change_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(
                ModifyKind::Any | ModifyKind::Data(_) | ModifyKind::Name(RenameMode::To)
            )
    )
}

/// Whether the path names a hidden, backup, or editor swap file
#[must_use]
pub fn is_noise(path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy();
    name.starts_with('.') || name.ends_with('~') || name.ends_with(".swp")
}

/// Whether any component of `path` below `root` is one of the excluded directory names
#[must_use]
pub fn is_excluded(path: &Path, root: &Path, excluded_dirs: &[String]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| excluded_dirs.iter().any(|excluded| excluded == name))
    })
}
