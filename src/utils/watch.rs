// File watching: pattern-keyed event handlers and the notify bridge that feeds them

use crate::utils::{Logger, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Kind of change reported to watch handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Add,
    Change,
    Unlink,
}

impl WatchEventKind {
    /// Map a notify event kind; access and metadata-only events are dropped.
    pub fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Add),
            EventKind::Remove(_) => Some(Self::Unlink),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Change),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Unlink => "unlink",
        }
    }
}

pub type WatchHandler = Arc<dyn Fn(WatchEventKind, &Path) + Send + Sync>;

struct WatchEvent {
    pattern: Regex,
    handler: WatchHandler,
}

/// Registry of `(pattern, handler)` pairs consulted for every file event
#[derive(Default)]
pub struct WatchRegistry {
    events: RwLock<Vec<WatchEvent>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&self, pattern: Regex, handler: WatchHandler) {
        Logger::debug(&format!("Watch event registered for /{}/", pattern.as_str()));
        self.events.write().push(WatchEvent { pattern, handler });
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    /// Call every handler whose pattern matches `path`, in registration order.
    /// Returns how many handlers ran.
    pub fn dispatch(&self, kind: WatchEventKind, path: &Path) -> usize {
        let normalized = normalize_path(path);

        // Handlers run outside the lock so they may register further events.
        let matched: Vec<WatchHandler> = self
            .events
            .read()
            .iter()
            .filter(|event| event.pattern.is_match(&normalized))
            .map(|event| event.handler.clone())
            .collect();

        for handler in &matched {
            handler(kind, path);
        }
        matched.len()
    }
}

/// `/`-separated rendering of a path, so patterns behave the same on every platform
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Recursive watcher on `root` forwarding relevant events to an async channel.
///
/// The returned watcher must be kept alive for events to keep flowing.
pub fn watch_directory(
    root: &Path,
    ignored: Option<Regex>,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<(WatchEventKind, PathBuf)>)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let Some(kind) = WatchEventKind::from_notify(&event.kind) else {
                    return;
                };
                for path in event.paths {
                    let is_ignored = ignored
                        .as_ref()
                        .is_some_and(|pattern| pattern.is_match(&normalize_path(&path)));
                    if !is_ignored {
                        let _ = tx.send((kind, path));
                    }
                }
            }
            Err(e) => Logger::warn(&format!("Watch error: {}", e)),
        },
        notify::Config::default(),
    )?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    Logger::debug(&format!("Watching {}", root.display()));

    Ok((watcher, rx))
}
