//! Theme hot reloading
//!
//! In development mode every directory of the active theme is watched for
//! changes. A changed `.hbs` file does not rebuild the registry directly: it
//! asks for a rebuild through a single-slot queue drained by one worker
//! thread. While a rebuild is pending, further requests fold into it, so a
//! save-all across many files costs at most one extra rebuild.
//!
//! Debounced events carry no kind, so any change to a `.hbs` path counts:
//! creates, removes and metadata updates rebuild as well as content writes.

use std::path::{Path, PathBuf};
use std::sync::Weak;
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::thread;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tracing::{debug, error, info, trace, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::registry::Shared;

/// Whether a path is a template source
pub(crate) fn is_template(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "hbs")
}

/// Sending half of the rebuild queue
#[derive(Clone)]
pub(crate) struct RebuildQueue {
    sender: SyncSender<()>,
}

impl RebuildQueue {
    fn channel() -> (Self, Receiver<()>) {
        let (sender, receiver) = sync_channel(1);
        (Self { sender }, receiver)
    }

    /// Starts the rebuild worker for `shared`
    ///
    /// The worker exits once the registry is dropped and every queue handle is gone.
    pub(crate) fn spawn(shared: Weak<Shared>) -> Result<Self> {
        let (queue, receiver) = Self::channel();
        thread::Builder::new()
            .name("theme-rebuild".to_string())
            .spawn(move || {
                while receiver.recv().is_ok() {
                    let Some(registry) = shared.upgrade() else {
                        break;
                    };
                    match registry.regenerate() {
                        Ok(()) => info!("Theme rebuilt after file change"),
                        Err(e) => error!(error = %e, "Theme rebuild failed"),
                    }
                }
                debug!("Theme rebuild worker stopped");
            })
            .map_err(Error::Spawn)?;
        Ok(queue)
    }

    /// Asks for a rebuild; returns false once the worker is gone
    pub(crate) fn request(&self) -> bool {
        match self.sender.try_send(()) {
            Ok(()) => {
                debug!("Queued theme rebuild");
                true
            }
            Err(TrySendError::Full(())) => {
                trace!("Theme rebuild already pending");
                true
            }
            Err(TrySendError::Disconnected(())) => {
                warn!("Theme rebuild worker has stopped");
                false
            }
        }
    }
}

/// Watches the directories of the active theme
pub(crate) struct ThemeWatcher {
    debouncer: Debouncer<RecommendedWatcher>,
    watched: Vec<PathBuf>,
}

impl ThemeWatcher {
    pub(crate) fn new(queue: RebuildQueue, debounce: Duration) -> Result<Self> {
        let debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
            Ok(events) => {
                if let Some(event) = events.iter().find(|event| is_template(&event.path)) {
                    debug!(path = %event.path.display(), "Template change detected");
                    queue.request();
                }
            }
            Err(e) => warn!(error = %e, "Error while watching theme directory"),
        })?;
        Ok(Self {
            debouncer,
            watched: Vec::new(),
        })
    }

    /// Replaces the watched set with every directory under `theme_path`
    pub(crate) fn watch_theme(&mut self, theme_path: &Path) -> Result<()> {
        for dir in self.watched.drain(..) {
            if let Err(e) = self.debouncer.watcher().unwatch(&dir) {
                debug!(path = %dir.display(), error = %e, "Failed to unwatch directory");
            }
        }
        for entry in WalkDir::new(theme_path).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            self.debouncer
                .watcher()
                .watch(entry.path(), RecursiveMode::NonRecursive)?;
            debug!(path = %entry.path().display(), "Watching theme directory");
            self.watched.push(entry.into_path());
        }
        Ok(())
    }

    pub(crate) fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}
