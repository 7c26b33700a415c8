//! Live duplicate detection for a watched directory.
//!
//! Filesystem notifications are pushed into a channel by the watcher and
//! drained by a single worker thread that owns the [`MonitorIndex`], so each
//! event is fully handled (hash, lookup, optional move, log) before the next
//! one is looked at.

mod activity;
mod index;

pub use activity::{ActivityEntry, ActivityKind, ActivityLog, ACTIVITY_TARGET};
pub use index::MonitorIndex;

use crate::config::{MonitorConfig, DEFAULT_ORGANIZE_FOLDER};
use crate::error::Error;
use index::EventHandler;
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub directory: PathBuf,
    pub auto_organize: bool,
    /// Defaults to `<directory>/Auto_Organized`.
    pub organize_path: Option<PathBuf>,
    pub settle_delay: Duration,
    /// `None` keeps every entry.
    pub log_capacity: Option<usize>,
}

impl MonitorOptions {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            auto_organize: true,
            organize_path: None,
            settle_delay: Duration::from_secs(1),
            log_capacity: Some(10_000),
        }
    }

    pub fn from_config(config: &MonitorConfig, directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        Self {
            organize_path: Some(config.organize_dir(&directory)),
            directory,
            auto_organize: config.auto_organize,
            settle_delay: config.settle_delay(),
            log_capacity: config.log_capacity(),
        }
    }

    pub fn organize_dir(&self) -> PathBuf {
        self.organize_path
            .clone()
            .unwrap_or_else(|| self.directory.join(DEFAULT_ORGANIZE_FOLDER))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
}

enum Message {
    Fs(Event),
    WatchError(notify::Error),
    Shutdown,
}

struct Running {
    watcher: RecommendedWatcher,
    tx: Sender<Message>,
    stopping: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

pub struct FileMonitor {
    options: MonitorOptions,
    log: Arc<Mutex<ActivityLog>>,
    running: Option<Running>,
}

impl FileMonitor {
    pub fn new(options: MonitorOptions) -> Self {
        let log = ActivityLog::new(options.log_capacity);
        Self {
            options,
            log: Arc::new(Mutex::new(log)),
            running: None,
        }
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }

    pub fn state(&self) -> MonitorState {
        if self.running.is_some() {
            MonitorState::Running
        } else {
            MonitorState::Stopped
        }
    }

    /// Build the index from the current directory contents, then subscribe to
    /// create and rename notifications below it. A running monitor is left as is.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.running.is_some() {
            warn!("Monitor already running on {}", self.options.directory.display());
            return Ok(());
        }

        let directory = match fs::canonicalize(&self.options.directory) {
            Ok(canonical) if canonical.is_dir() => canonical,
            _ => return Err(Error::InvalidPath(self.options.directory.clone())),
        };
        // Watcher events carry canonical paths; compare like with like.
        let organize_dir = resolve_path(&self.options.organize_dir());

        info!("Building monitor index for {}", directory.display());
        let index = MonitorIndex::build(&directory, &organize_dir)?;

        let handler = EventHandler::new(
            index,
            self.log.clone(),
            organize_dir,
            self.options.auto_organize,
            self.options.settle_delay,
        );

        let (tx, rx) = mpsc::channel();
        let stopping = Arc::new(AtomicBool::new(false));

        let event_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let message = match res {
                Ok(event) => Message::Fs(event),
                Err(e) => Message::WatchError(e),
            };
            let _ = event_tx.send(message);
        })?;
        watcher.watch(&directory, RecursiveMode::Recursive)?;

        let worker_stopping = stopping.clone();
        let worker = thread::Builder::new()
            .name("dupe-scout-monitor".into())
            .spawn(move || run_worker(handler, rx, worker_stopping))?;

        self.running = Some(Running {
            watcher,
            tx,
            stopping,
            worker,
        });

        self.record(
            ActivityKind::Started,
            format!("Started monitoring {}", directory.display()),
        );
        Ok(())
    }

    /// Unsubscribe and wait for the event being handled, if any. Queued events
    /// are dropped. Calling this on a stopped monitor does nothing.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.stopping.store(true, Ordering::SeqCst);
        drop(running.watcher);
        let _ = running.tx.send(Message::Shutdown);
        drop(running.tx);

        if running.worker.join().is_err() {
            error!("Monitor worker panicked");
        }

        self.record(
            ActivityKind::Stopped,
            format!("Stopped monitoring {}", self.options.directory.display()),
        );
    }

    pub fn activity_log(&self) -> Vec<ActivityEntry> {
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entries()
    }

    fn record(&self, kind: ActivityKind, event: String) {
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(kind, event);
    }
}

impl Drop for FileMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Canonical form of a path that may not exist yet: the deepest existing
/// ancestor is canonicalized and the missing components are appended.
fn resolve_path(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut existing = path;
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn run_worker(mut handler: EventHandler, rx: Receiver<Message>, stopping: Arc<AtomicBool>) {
    for message in rx {
        if stopping.load(Ordering::SeqCst) {
            break;
        }
        match message {
            Message::Fs(event) => {
                for path in new_file_paths(&event) {
                    debug!("{:?} {}", event.kind, path.display());
                    handler.handle_path(&path);
                }
            }
            Message::WatchError(e) => {
                handler.record(ActivityKind::Error, format!("Watch error: {}", e));
            }
            Message::Shutdown => break,
        }
    }
}

/// Paths that became new files through this event. Renames are taken from
/// their destination side only.
fn new_file_paths(event: &Event) -> Vec<PathBuf> {
    match &event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.clone(),
        // Backends that cannot tell the two sides apart report both paths.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event
            .paths
            .iter()
            .filter(|p| p.is_file())
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::DataChange;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_create_and_rename_to_are_new_files() {
        let created = event(EventKind::Create(CreateKind::File), &["/w/a.bin"]);
        assert_eq!(new_file_paths(&created), vec![PathBuf::from("/w/a.bin")]);

        let renamed = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/w/b.bin"],
        );
        assert_eq!(new_file_paths(&renamed), vec![PathBuf::from("/w/b.bin")]);
    }

    #[test]
    fn test_other_events_ignored() {
        let folder = event(EventKind::Create(CreateKind::Folder), &["/w/dir"]);
        assert!(new_file_paths(&folder).is_empty());

        let data = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/w/a.bin"],
        );
        assert!(new_file_paths(&data).is_empty());

        let from = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/w/a.bin"],
        );
        assert!(new_file_paths(&from).is_empty());

        let both = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/w/a.bin", "/w/b.bin"],
        );
        assert!(new_file_paths(&both).is_empty());
    }

    #[test]
    fn test_options_default_organize_dir() {
        let options = MonitorOptions::new("/watch");
        assert_eq!(options.organize_dir(), PathBuf::from("/watch/Auto_Organized"));
        assert!(options.auto_organize);
    }

    #[test]
    fn test_resolve_path_for_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let existing = dir.path().join("sub").join("..").join("sub");
        assert_eq!(resolve_path(&existing), canonical.join("sub"));

        let missing = dir.path().join("sub").join("..").join("new").join("deeper");
        assert_eq!(resolve_path(&missing), canonical.join("new").join("deeper"));
    }

    #[test]
    fn test_start_on_missing_directory_is_invalid_path() {
        let mut monitor = FileMonitor::new(MonitorOptions::new("/definitely/not/here"));
        let err = monitor.start().unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert!(monitor.activity_log().is_empty());
    }
}
