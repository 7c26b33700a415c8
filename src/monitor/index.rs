use super::activity::{ActivityKind, ActivityLog};
use crate::error::Error;
use crate::hasher;
use crate::model::{ContentHash, FileRecord};
use crate::organize;
use crate::scanner::{self, InventoryOptions};
use ahash::AHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Content hash → first file seen with that content.
#[derive(Debug, Default)]
pub struct MonitorIndex {
    known: AHashMap<ContentHash, FileRecord>,
}

impl MonitorIndex {
    /// One recursive inventory plus hash pass over `directory`, leaving out
    /// anything under `organize_dir`.
    pub fn build(directory: &Path, organize_dir: &Path) -> Result<Self, Error> {
        let mut index = Self::default();
        let records = scanner::walk_files(directory, &InventoryOptions::default())?;
        for mut record in records
            .into_iter()
            .filter(|r| !r.path.starts_with(organize_dir))
        {
            match hasher::hash_file(&record.path) {
                Ok(hash) => {
                    record.content_hash = Some(hash);
                    index.known.entry(hash).or_insert(record);
                }
                Err(e) => warn!("Skipping: {}", e),
            }
        }
        debug!("Monitor index holds {} distinct files", index.len());
        Ok(index)
    }

    pub fn get(&self, hash: &ContentHash) -> Option<&FileRecord> {
        self.known.get(hash)
    }

    pub fn insert(&mut self, record: FileRecord) {
        if let Some(hash) = record.content_hash {
            self.known.entry(hash).or_insert(record);
        }
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

/// Processes one new path at a time against the index it owns.
pub(crate) struct EventHandler {
    index: MonitorIndex,
    log: Arc<Mutex<ActivityLog>>,
    organize_dir: PathBuf,
    auto_organize: bool,
    settle_delay: Duration,
}

impl EventHandler {
    pub(crate) fn new(
        index: MonitorIndex,
        log: Arc<Mutex<ActivityLog>>,
        organize_dir: PathBuf,
        auto_organize: bool,
        settle_delay: Duration,
    ) -> Self {
        Self {
            index,
            log,
            organize_dir,
            auto_organize,
            settle_delay,
        }
    }

    pub(crate) fn record(&self, kind: ActivityKind, event: impl Into<String>) {
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(kind, event);
    }

    pub(crate) fn handle_path(&mut self, path: &Path) {
        // Files we moved into the organize folder come back as events.
        if path.starts_with(&self.organize_dir) {
            trace!("Ignoring organized file {}", path.display());
            return;
        }

        // Let the writer finish.
        thread::sleep(self.settle_delay);

        if path.is_dir() {
            return;
        }

        let file_name = display_name(path);
        let hash = match hasher::hash_file(path) {
            Ok(hash) => hash,
            Err(e) => {
                self.record(
                    ActivityKind::Error,
                    format!("Error processing {}: {}", path.display(), e),
                );
                return;
            }
        };

        match self.index.get(&hash) {
            Some(original) if original.path == path => {
                trace!("{} already indexed", path.display());
            }
            Some(original) => {
                let original_name = original.name.clone();
                let original_path = original.path.clone();
                self.record(
                    ActivityKind::DuplicateDetected,
                    format!(
                        "Duplicate detected: {} matches {} ({})",
                        file_name,
                        original_name,
                        original_path.display()
                    ),
                );
                if self.auto_organize {
                    self.organize(path, &file_name);
                }
            }
            None => match fs::metadata(path) {
                Ok(metadata) => {
                    let mut record = FileRecord::from_metadata(path, &metadata);
                    record.content_hash = Some(hash);
                    self.index.insert(record);
                    self.record(
                        ActivityKind::NewFile,
                        format!("New unique file: {}", file_name),
                    );
                }
                Err(e) => self.record(
                    ActivityKind::Error,
                    format!("Error processing {}: {}", path.display(), e),
                ),
            },
        }
    }

    fn organize(&self, path: &Path, file_name: &str) {
        match organize::relocate(path, &self.organize_dir) {
            Ok(destination) => self.record(
                ActivityKind::Organized,
                format!(
                    "Organized duplicate: {} → {}",
                    file_name,
                    destination.display()
                ),
            ),
            Err(e) => self.record(
                ActivityKind::Error,
                format!("Failed to organize duplicate: {}", e),
            ),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn handler(dir: &Path, auto_organize: bool) -> (EventHandler, Arc<Mutex<ActivityLog>>) {
        let log = Arc::new(Mutex::new(ActivityLog::new(None)));
        let organize_dir = dir.join("Auto_Organized");
        let index = MonitorIndex::build(dir, &organize_dir).unwrap();
        let handler = EventHandler::new(
            index,
            log.clone(),
            organize_dir,
            auto_organize,
            Duration::ZERO,
        );
        (handler, log)
    }

    fn kinds(log: &Arc<Mutex<ActivityLog>>) -> Vec<ActivityKind> {
        log.lock().unwrap().entries().iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_index_keeps_first_seen_record() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), "dup").unwrap();
        fs::write(dir.path().join("b.bin"), "dup").unwrap();
        fs::write(dir.path().join("c.bin"), "unique").unwrap();

        let index = MonitorIndex::build(dir.path(), &dir.path().join("Auto_Organized")).unwrap();
        assert_eq!(index.len(), 2);
        let hash = hasher::hash_file(&dir.path().join("b.bin")).unwrap();
        assert_eq!(index.get(&hash).unwrap().name, "a.bin");
    }

    #[test]
    fn test_index_skips_organize_dir() {
        let dir = tempdir().unwrap();
        let organized = dir.path().join("Auto_Organized");
        fs::create_dir(&organized).unwrap();
        fs::write(organized.join("old.bin"), "moved earlier").unwrap();
        fs::write(dir.path().join("x.bin"), "known").unwrap();

        let index = MonitorIndex::build(dir.path(), &organized).unwrap();
        assert_eq!(index.len(), 1);
        let hash = hasher::hash_file(&organized.join("old.bin")).unwrap();
        assert!(index.get(&hash).is_none());
    }

    #[test]
    fn test_new_unique_file_is_indexed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.bin"), "known").unwrap();
        let (mut handler, log) = handler(dir.path(), true);

        let new_path = dir.path().join("new.bin");
        fs::write(&new_path, "fresh").unwrap();
        handler.handle_path(&new_path);
        assert_eq!(kinds(&log), vec![ActivityKind::NewFile]);
        assert_eq!(handler.index.len(), 2);

        // A second event for the same path is not a duplicate of itself.
        handler.handle_path(&new_path);
        assert_eq!(kinds(&log), vec![ActivityKind::NewFile]);
    }

    #[test]
    fn test_duplicate_without_organize_stays_put() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.bin"), "known").unwrap();
        let (mut handler, log) = handler(dir.path(), false);

        let dup = dir.path().join("y.bin");
        fs::write(&dup, "known").unwrap();
        handler.handle_path(&dup);

        assert_eq!(kinds(&log), vec![ActivityKind::DuplicateDetected]);
        assert!(log.lock().unwrap().entries()[0].event.contains("x.bin"));
        assert!(dup.exists());
    }

    #[test]
    fn test_duplicate_is_organized_with_suffix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.bin"), "known").unwrap();
        let organized = dir.path().join("Auto_Organized");
        fs::create_dir(&organized).unwrap();
        fs::write(organized.join("y.bin"), "occupied").unwrap();
        let (mut handler, log) = handler(dir.path(), true);

        let dup = dir.path().join("y.bin");
        fs::write(&dup, "known").unwrap();
        handler.handle_path(&dup);

        assert_eq!(
            kinds(&log),
            vec![ActivityKind::DuplicateDetected, ActivityKind::Organized]
        );
        assert!(!dup.exists());
        assert_eq!(fs::read_to_string(organized.join("y_1.bin")).unwrap(), "known");
    }

    #[test]
    fn test_missing_path_logs_error() {
        let dir = tempdir().unwrap();
        let (mut handler, log) = handler(dir.path(), true);
        handler.handle_path(&dir.path().join("vanished.bin"));
        assert_eq!(kinds(&log), vec![ActivityKind::Error]);
    }

    #[test]
    fn test_events_inside_organize_dir_ignored() {
        let dir = tempdir().unwrap();
        let organized = dir.path().join("Auto_Organized");
        fs::create_dir(&organized).unwrap();
        let (mut handler, log) = handler(dir.path(), true);

        let moved = organized.join("z.bin");
        fs::write(&moved, "anything").unwrap();
        handler.handle_path(&moved);
        assert!(log.lock().unwrap().is_empty());
    }
}
