use crate::config::AppConfig;
use crate::error::Error;
use crate::model::FileRecord;
use crate::platform;
use glob::Pattern;
use std::fs;
use std::path::Path;
use tracing::{debug, error, trace};
use walkdir::{DirEntry, WalkDir};

/// Case-insensitive filename suffix allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    suffixes: Vec<String>,
}

impl ExtensionFilter {
    /// Accepts `pdf`, `.pdf` or `.PDF` alike. Returns `None` when nothing usable is given.
    pub fn new<I, S>(extensions: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{}", ext))
            .collect();

        if suffixes.is_empty() {
            None
        } else {
            Some(Self { suffixes })
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.suffixes.iter().any(|suffix| lower.ends_with(suffix))
    }
}

#[derive(Debug, Clone)]
pub struct InventoryOptions {
    pub recursive: bool,
    pub extensions: Option<ExtensionFilter>,
    pub ignore_patterns: Vec<Pattern>,
}

impl Default for InventoryOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            extensions: None,
            ignore_patterns: Vec::new(),
        }
    }
}

impl InventoryOptions {
    pub fn new(recursive: bool, extensions: Option<ExtensionFilter>) -> Self {
        Self {
            recursive,
            extensions,
            ignore_patterns: Vec::new(),
        }
    }

    /// Invalid glob patterns are logged and dropped.
    pub fn with_ignore_globs<S: AsRef<str>>(mut self, globs: &[S]) -> Self {
        self.ignore_patterns = globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob.as_ref()) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob.as_ref(), e);
                    None
                }
            })
            .collect();
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.recursive, ExtensionFilter::new(&config.extensions))
            .with_ignore_globs(&config.ignore_patterns)
    }
}

/// Depth-first walk of `root` producing one record per regular file.
///
/// The root is canonicalized first, so every record path is absolute and
/// spelled the same way whichever form of the root was given.
/// Entries that vanish or cannot be stat'ed are skipped. Reserved trash and
/// system directories below the root are never descended into. Symlinks are
/// not followed.
pub fn walk_files(root: &Path, options: &InventoryOptions) -> Result<Vec<FileRecord>, Error> {
    let canonical_root = match fs::canonicalize(root) {
        Ok(canonical) if canonical.is_dir() => canonical,
        _ => return Err(Error::InvalidPath(root.to_path_buf())),
    };
    let root = canonical_root.as_path();

    let max_depth = if options.recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_excluded(root, entry, options));

    let mut records = Vec::new();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Skipping unreadable entry: {}", err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if let Some(filter) = &options.extensions {
            if !filter.matches(&file_name) {
                continue;
            }
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                debug!("Skipping {}: {}", entry.path().display(), err);
                continue;
            }
        };

        trace!("Found {}", entry.path().display());
        records.push(FileRecord::from_metadata(entry.path(), &metadata));
    }

    debug!("{} files found under {}", records.len(), root.display());
    Ok(records)
}

fn is_excluded(root: &Path, entry: &DirEntry, options: &InventoryOptions) -> bool {
    let path = entry.path();

    if entry.file_type().is_dir() {
        let relative = path.strip_prefix(root).unwrap_or(path);
        if platform::is_reserved_path(relative) {
            trace!("Skipping reserved directory {}", path.display());
            return true;
        }
    }

    options
        .ignore_patterns
        .iter()
        .any(|pattern| pattern.matches_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn names(records: &[FileRecord]) -> Vec<String> {
        records.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn test_extension_filter_normalizes() {
        let filter = ExtensionFilter::new(["PDF", ".txt", " "]).unwrap();
        assert!(filter.matches("report.pdf"));
        assert!(filter.matches("REPORT.PDF"));
        assert!(filter.matches("notes.TxT"));
        assert!(!filter.matches("image.png"));
        assert!(!filter.matches("pdf"));
        assert!(ExtensionFilter::new(Vec::<String>::new()).is_none());
    }

    #[test]
    fn test_non_recursive_only_lists_root_entries() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("top.txt"), "top").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("nested.txt"), "nested").unwrap();

        let flat = walk_files(dir.path(), &InventoryOptions::new(false, None)).unwrap();
        assert_eq!(names(&flat), vec!["top.txt"]);

        let deep = walk_files(dir.path(), &InventoryOptions::new(true, None)).unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_extension_filter_applied_during_walk() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.PDF"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        let options = InventoryOptions::new(true, ExtensionFilter::new(["pdf"]));
        let records = walk_files(dir.path(), &options).unwrap();
        assert_eq!(names(&records), vec!["a.PDF"]);
    }

    #[test]
    fn test_reserved_directories_skipped() {
        let dir = tempdir().unwrap();
        for reserved in ["$RECYCLE.BIN", ".Trashes", ".Trash-1000"] {
            let path = dir.path().join(reserved);
            fs::create_dir(&path).unwrap();
            fs::write(path.join("deleted.txt"), "gone").unwrap();
        }
        let trash = dir.path().join(".local").join("share").join("Trash");
        fs::create_dir_all(&trash).unwrap();
        fs::write(trash.join("old.txt"), "old").unwrap();
        fs::write(dir.path().join("kept.txt"), "kept").unwrap();

        let records = walk_files(dir.path(), &InventoryOptions::default()).unwrap();
        assert_eq!(names(&records), vec!["kept.txt"]);
    }

    #[test]
    fn test_ignore_patterns() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules").join("x.js"), "x").unwrap();
        fs::write(dir.path().join("main.js"), "main").unwrap();

        let options = InventoryOptions::default().with_ignore_globs(&["*/node_modules", "["]);
        assert_eq!(options.ignore_patterns.len(), 1);
        let records = walk_files(dir.path(), &options).unwrap();
        assert_eq!(names(&records), vec!["main.js"]);
    }

    #[test]
    fn test_missing_root_is_invalid_path() {
        let missing = PathBuf::from("/definitely/not/here");
        let err = walk_files(&missing, &InventoryOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[test]
    fn test_file_root_is_invalid_path() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("f.txt");
        fs::write(&file, "f").unwrap();
        let err = walk_files(&file, &InventoryOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[test]
    fn test_records_use_canonical_root() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("only.txt"), "only").unwrap();

        let roundabout = dir.path().join("sub").join("..").join(".");
        let records = walk_files(&roundabout, &InventoryOptions::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].path.is_absolute());
        assert_eq!(
            records[0].path,
            dir.path().canonicalize().unwrap().join("only.txt")
        );
    }
}
