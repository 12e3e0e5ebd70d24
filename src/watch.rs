//! File watching and render debouncing for watch mode.
//!
//! The watcher reports changes to a fixed set of files (the markdown source
//! and optionally a theme stylesheet). Parent directories are watched rather
//! than the files themselves so editors that save by rename are still seen.
//! The debouncer turns a burst of change events into a single re-render.

use log::{debug, warn};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Debouncer
// ─────────────────────────────────────────────────────────────────────────────

/// Default delay between the last change and the re-render.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Single-slot timer: at most one render is pending at a time.
///
/// Scheduling while a render is pending restarts the timer.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the timer at `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Whether a render is pending.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` once when the timer has expired, clearing it.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending render.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Watcher
// ─────────────────────────────────────────────────────────────────────────────

/// Events reported by [`FileWatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A watched file was created, modified or removed
    Changed(PathBuf),
    /// The watcher encountered an error
    Error(String),
}

/// Watches a fixed set of files.
#[derive(Debug)]
pub struct FileWatcher {
    /// The internal notify watcher
    _watcher: RecommendedWatcher,
    /// Receiver for file system events
    receiver: Receiver<WatchEvent>,
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

impl FileWatcher {
    /// Start watching `files`.
    pub fn new(files: &[PathBuf]) -> Result<Self> {
        let targets: BTreeSet<PathBuf> = files.iter().map(|f| normalize(f)).collect();
        let dirs: BTreeSet<PathBuf> = targets
            .iter()
            .filter_map(|f| f.parent().map(Path::to_path_buf))
            .collect();

        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |result: std::result::Result<Event, notify::Error>| {
                Self::handle_event(result, &targets, &tx);
            },
            Config::default().with_poll_interval(Duration::from_millis(500)),
        )?;

        for dir in &dirs {
            debug!("Watching {}", dir.display());
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|e| Error::Watch(format!("Failed to watch {}: {}", dir.display(), e)))?;
        }

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    fn handle_event(
        result: std::result::Result<Event, notify::Error>,
        targets: &BTreeSet<PathBuf>,
        tx: &Sender<WatchEvent>,
    ) {
        match result {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                for path in filter_targets(event.paths, targets) {
                    let _ = tx.send(WatchEvent::Changed(path));
                }
            }
            Err(e) => {
                warn!("File watcher error: {}", e);
                let _ = tx.send(WatchEvent::Error(e.to_string()));
            }
        }
    }

    /// Drain pending events without blocking.
    pub fn poll_events(&self) -> Vec<WatchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Keep only paths that are one of `targets`.
pub fn filter_targets(paths: Vec<PathBuf>, targets: &BTreeSet<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|p| targets.contains(p) || targets.contains(&normalize(p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debouncer_fires_once_after_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        assert!(!debouncer.poll(start));

        debouncer.schedule(start);
        assert!(debouncer.is_pending());
        assert!(!debouncer.poll(start + Duration::from_millis(299)));
        assert!(debouncer.poll(start + Duration::from_millis(300)));
        assert!(!debouncer.poll(start + Duration::from_millis(600)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_debouncer_restarts_on_schedule() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        debouncer.schedule(start);
        debouncer.schedule(start + Duration::from_millis(200));
        assert!(!debouncer.poll(start + Duration::from_millis(400)));
        assert!(debouncer.poll(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_debouncer_cancel() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        debouncer.schedule(start);
        debouncer.cancel();
        assert!(!debouncer.poll(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_filter_targets() {
        let targets: BTreeSet<PathBuf> = [PathBuf::from("/docs/post.md")].into_iter().collect();
        let paths = vec![
            PathBuf::from("/docs/post.md"),
            PathBuf::from("/docs/.post.md.swp"),
            PathBuf::from("/docs/other.md"),
        ];
        assert_eq!(filter_targets(paths, &targets), vec![PathBuf::from("/docs/post.md")]);
    }

    #[test]
    fn test_watcher_starts_on_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("post.md");
        std::fs::write(&file, "# Hi").unwrap();
        let watcher = FileWatcher::new(&[file]).unwrap();
        assert!(watcher
            .poll_events()
            .iter()
            .all(|e| matches!(e, WatchEvent::Changed(_))));
    }
}
