use crate::error::Error;
use crate::model::{DuplicateGroup, FileRecord};
use ahash::AHashSet;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// First free path for `file_name` inside `dir`, appending `_1`, `_2`, ...
/// before the extension on collision.
pub fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    first_free(dir, file_name, |path| path.exists())
}

fn first_free(dir: &Path, file_name: &OsStr, taken: impl Fn(&Path) -> bool) -> PathBuf {
    let initial = dir.join(file_name);
    if !taken(&initial) {
        return initial;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = name
        .extension()
        .map(|s| s.to_string_lossy().into_owned());

    let mut counter = 1;
    loop {
        let candidate = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let path = dir.join(candidate);
        if !taken(&path) {
            return path;
        }
        counter += 1;
    }
}

/// Move `source` into `dest_dir`, creating it if needed, under the first
/// free name there.
pub fn relocate(source: &Path, dest_dir: &Path) -> Result<PathBuf, Error> {
    fs::create_dir_all(dest_dir).map_err(|e| organize_failed(source, e))?;

    let file_name = source.file_name().ok_or_else(|| {
        organize_failed(
            source,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    let destination = unique_destination(dest_dir, file_name);
    move_file(source, &destination)?;
    Ok(destination)
}

/// Rename, falling back to copy-and-remove when a plain rename is not
/// possible (e.g. across devices).
fn move_file(source: &Path, destination: &Path) -> Result<(), Error> {
    if let Err(rename_err) = fs::rename(source, destination) {
        debug!(
            "Rename {} failed ({}), copying instead",
            source.display(),
            rename_err
        );
        fs::copy(source, destination).map_err(|e| organize_failed(source, e))?;
        if let Err(e) = fs::remove_file(source) {
            let _ = fs::remove_file(destination);
            return Err(organize_failed(source, e));
        }
    }
    Ok(())
}

fn organize_failed(path: &Path, source: io::Error) -> Error {
    Error::OrganizeFailed {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Move,
    Copy,
}

#[derive(Debug, Clone)]
pub struct PlannedTransfer {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct PlannedFolder {
    pub name: String,
    pub path: PathBuf,
    pub transfers: Vec<PlannedTransfer>,
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationPlan {
    pub destination: PathBuf,
    pub folders: Vec<PlannedFolder>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeStats {
    pub moved: usize,
    pub copied: usize,
    pub errors: usize,
    pub total_size: u64,
}

/// One folder per duplicate group, `Duplicates_<first name>_<id prefix>`.
/// With `keep_original` the first file of each group stays where it is.
pub fn plan_organization(
    groups: &[DuplicateGroup],
    destination: &Path,
    keep_original: bool,
) -> OrganizationPlan {
    let folders = groups
        .iter()
        .filter(|group| group.files.len() > 1)
        .map(|group| {
            let id: String = group.id.to_string().chars().take(8).collect();
            let name = format!("Duplicates_{}_{}", group.files[0].name, id);
            let path = destination.join(&name);
            let skip = usize::from(keep_original);

            // Same-named members get distinct final names up front.
            let mut claimed: AHashSet<PathBuf> = AHashSet::new();
            let transfers = group
                .files
                .iter()
                .skip(skip)
                .map(|file| {
                    let destination = first_free(&path, OsStr::new(&file.name), |candidate| {
                        claimed.contains(candidate) || candidate.exists()
                    });
                    claimed.insert(destination.clone());
                    PlannedTransfer {
                        source: file.path.clone(),
                        destination,
                        size: file.size,
                    }
                })
                .collect();

            PlannedFolder {
                name,
                path,
                transfers,
            }
        })
        .collect();

    OrganizationPlan {
        destination: destination.to_path_buf(),
        folders,
    }
}

impl OrganizationPlan {
    pub fn file_count(&self) -> usize {
        self.folders.iter().map(|f| f.transfers.len()).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.folders
            .iter()
            .flat_map(|f| f.transfers.iter())
            .map(|t| t.size)
            .sum()
    }

    /// Carry out every transfer to its planned destination. A failure is
    /// counted and the batch goes on; a folder that cannot be created counts
    /// once and its files are skipped.
    pub fn execute(&self, mode: TransferMode) -> OrganizeStats {
        let mut stats = OrganizeStats::default();

        for folder in &self.folders {
            if let Err(e) = fs::create_dir_all(&folder.path) {
                error!("Cannot create {}: {}", folder.path.display(), e);
                stats.errors += 1;
                continue;
            }

            for transfer in &folder.transfers {
                let destination = if transfer.destination.exists() {
                    // Taken since planning; never overwrite.
                    let name = transfer
                        .destination
                        .file_name()
                        .unwrap_or_else(|| transfer.source.as_os_str());
                    let fresh = unique_destination(&folder.path, name);
                    warn!(
                        "{} appeared after planning, using {}",
                        transfer.destination.display(),
                        fresh.display()
                    );
                    fresh
                } else {
                    transfer.destination.clone()
                };

                let result = match mode {
                    TransferMode::Move => move_file(&transfer.source, &destination),
                    TransferMode::Copy => fs::copy(&transfer.source, &destination)
                        .map(|_| ())
                        .map_err(|e| organize_failed(&transfer.source, e)),
                };

                match result {
                    Ok(()) => {
                        match mode {
                            TransferMode::Move => stats.moved += 1,
                            TransferMode::Copy => stats.copied += 1,
                        }
                        stats.total_size += transfer.size;
                    }
                    Err(e) => {
                        error!("{}", e);
                        stats.errors += 1;
                    }
                }
            }
        }

        info!(
            "Organized into {}: {} moved, {} copied, {} errors",
            self.destination.display(),
            stats.moved,
            stats.copied,
            stats.errors
        );
        stats
    }
}

/// Keep the most recently modified file of a group, remove the rest.
#[derive(Debug, Clone)]
pub struct KeepNewestPlan {
    pub keep: FileRecord,
    pub remove: Vec<FileRecord>,
}

#[derive(Debug, Default)]
pub struct DeletionOutcome {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub fn plan_keep_newest(group: &DuplicateGroup) -> Option<KeepNewestPlan> {
    if group.files.len() < 2 {
        return None;
    }

    let mut files = group.files.clone();
    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
    let keep = files.remove(0);

    Some(KeepNewestPlan {
        keep,
        remove: files,
    })
}

impl KeepNewestPlan {
    pub fn execute(&self) -> DeletionOutcome {
        let mut outcome = DeletionOutcome::default();

        for file in &self.remove {
            match fs::remove_file(&file.path) {
                Ok(()) => outcome.deleted.push(file.path.clone()),
                Err(e) => {
                    error!("Failed to delete {}: {}", file.path.display(), e);
                    outcome.failed.push((file.path.clone(), e.to_string()));
                }
            }
        }

        info!(
            "Kept {}, deleted {} of {}",
            self.keep.path.display(),
            outcome.deleted.len(),
            self.remove.len()
        );
        outcome
    }
}
