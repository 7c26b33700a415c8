use chrono::{DateTime, Local};
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Fixed-length content fingerprint (BLAKE3, 32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A file discovered during inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Local>,
    pub content_hash: Option<ContentHash>,
    pub similarity_group: Option<u64>,
}

impl FileRecord {
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            modified: DateTime::<Local>::from(modified),
            content_hash: None,
            similarity_group: None,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.name.to_lowercase().ends_with(".pdf")
    }
}

/// Identifier of a duplicate group. Exact and similarity groups share one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupId {
    Exact(ContentHash),
    Similar(u64),
}

impl GroupId {
    pub fn kind(&self) -> GroupKind {
        match self {
            GroupId::Exact(_) => GroupKind::Exact,
            GroupId::Similar(_) => GroupKind::Similar,
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupId::Exact(hash) => write!(f, "{}", hash),
            GroupId::Similar(n) => write!(f, "sim-{}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Exact,
    Similar,
}

/// A set of two or more files judged identical or similar.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub id: GroupId,
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    pub fn kind(&self) -> GroupKind {
        self.id.kind()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Bytes held by every member but the first.
    pub fn wasted_bytes(&self) -> u64 {
        self.files.iter().skip(1).map(|f| f.size).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub exact_duplicates: usize,
    pub similar_files: usize,
    pub identical_names: usize,
    pub duplicate_groups: usize,
    pub similarity_groups: usize,
    pub wasted_bytes: u64,
}
