use crate::config::DEFAULT_SIMILARITY_THRESHOLD;
use crate::error::Error;
use crate::hasher;
use crate::model::{ContentHash, DuplicateGroup, FileRecord, GroupId, ScanStatistics};
use crate::scanner::{self, InventoryOptions};
use crate::similarity::SimilarityChain;
use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One scan: the inventory plus the indices built over it.
///
/// Indices hold positions into the inventory. A record is in the hash index
/// under at most one key, and in at most one similarity group.
#[derive(Debug)]
pub struct ScanSession {
    inventory: Vec<FileRecord>,
    known_paths: AHashSet<PathBuf>,
    hash_index: AHashMap<ContentHash, Vec<usize>>,
    name_index: AHashMap<String, Vec<usize>>,
    similarity_index: AHashMap<u64, Vec<usize>>,
    next_similarity_id: u64,
    similarity_threshold: f64,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl ScanSession {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            inventory: Vec::new(),
            known_paths: AHashSet::new(),
            hash_index: AHashMap::new(),
            name_index: AHashMap::new(),
            similarity_index: AHashMap::new(),
            next_similarity_id: 1,
            similarity_threshold,
        }
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Walk `root` and append its files to the inventory, indexing them by
    /// name as they are added. Paths already in the inventory are not added
    /// twice. Returns the newly added records.
    pub fn build_inventory(
        &mut self,
        root: &Path,
        options: &InventoryOptions,
    ) -> Result<&[FileRecord], Error> {
        let records = scanner::walk_files(root, options)?;
        let start = self.inventory.len();

        for record in records {
            if !self.known_paths.insert(record.path.clone()) {
                continue;
            }
            let index = self.inventory.len();
            self.name_index
                .entry(record.name.clone())
                .or_default()
                .push(index);
            self.inventory.push(record);
        }

        info!(
            "Inventoried {} files under {}",
            self.inventory.len() - start,
            root.display()
        );
        Ok(&self.inventory[start..])
    }

    pub fn inventory(&self) -> &[FileRecord] {
        &self.inventory
    }

    pub fn unhashed_count(&self) -> usize {
        self.inventory
            .iter()
            .filter(|r| r.content_hash.is_none())
            .count()
    }

    /// Lazily hash every record that has no hash yet.
    ///
    /// Each successful hash is indexed before it is yielded, so dropping the
    /// iterator early keeps all work done so far; calling again resumes with
    /// the remaining records. Unreadable files are logged and skipped.
    pub fn hash_all(&mut self) -> HashAll<'_> {
        HashAll {
            session: self,
            cursor: 0,
        }
    }

    fn record_hash(&mut self, index: usize, hash: ContentHash) {
        self.inventory[index].content_hash = Some(hash);
        self.hash_index.entry(hash).or_default().push(index);
    }

    /// Same-named PDF pairs whose hashes are known and differ.
    fn similarity_candidates(&self) -> Vec<(usize, usize)> {
        let mut names: Vec<&String> = self
            .name_index
            .iter()
            .filter(|(_, indices)| indices.len() > 1 && self.inventory[indices[0]].is_pdf())
            .map(|(name, _)| name)
            .collect();
        names.sort();

        let mut pairs = Vec::new();
        for name in names {
            let indices = &self.name_index[name];
            for (pos, &i) in indices.iter().enumerate() {
                for &j in &indices[pos + 1..] {
                    match (
                        self.inventory[i].content_hash,
                        self.inventory[j].content_hash,
                    ) {
                        (Some(a), Some(b)) if a != b => pairs.push((i, j)),
                        _ => {}
                    }
                }
            }
        }
        pairs
    }

    /// Score same-named PDFs that are not exact duplicates and group those at
    /// or above the threshold. A pair that cannot be scored counts as not
    /// similar. Returns the number of pairs merged.
    pub fn group_similar(&mut self, chain: &SimilarityChain) -> usize {
        let candidates = self.similarity_candidates();
        if candidates.is_empty() {
            return 0;
        }
        info!("Comparing {} same-name document pairs", candidates.len());

        let threshold = self.similarity_threshold;
        let inventory = &self.inventory;
        let scores: Vec<Option<f64>> = candidates
            .par_iter()
            .map(|&(i, j)| chain.score(&inventory[i].path, &inventory[j].path).ok())
            .collect();

        let mut merged = 0;
        for (&(i, j), score) in candidates.iter().zip(scores) {
            match score {
                Some(score) if score >= threshold => {
                    self.merge_similar(i, j);
                    merged += 1;
                }
                Some(score) => debug!(
                    "{} and {} below threshold ({:.3} < {:.3})",
                    self.inventory[i].path.display(),
                    self.inventory[j].path.display(),
                    score,
                    threshold
                ),
                None => {}
            }
        }
        merged
    }

    fn merge_similar(&mut self, i: usize, j: usize) {
        let group_i = self.inventory[i].similarity_group;
        let group_j = self.inventory[j].similarity_group;

        let id = match (group_i, group_j) {
            (Some(a), Some(b)) if a != b => {
                let moved = self.similarity_index.remove(&b).unwrap_or_default();
                for index in moved {
                    self.add_to_similarity_group(a, index);
                }
                a
            }
            (Some(a), _) => a,
            (None, Some(b)) => b,
            (None, None) => {
                let id = self.next_similarity_id;
                self.next_similarity_id += 1;
                id
            }
        };

        self.add_to_similarity_group(id, i);
        self.add_to_similarity_group(id, j);
    }

    fn add_to_similarity_group(&mut self, id: u64, index: usize) {
        self.inventory[index].similarity_group = Some(id);
        let members = self.similarity_index.entry(id).or_default();
        if !members.contains(&index) {
            members.push(index);
        }
    }

    fn records(&self, indices: &[usize]) -> Vec<FileRecord> {
        indices.iter().map(|&i| self.inventory[i].clone()).collect()
    }

    pub fn exact_groups(&self) -> Vec<DuplicateGroup> {
        let mut groups: Vec<(&ContentHash, &Vec<usize>)> = self
            .hash_index
            .iter()
            .filter(|(_, indices)| indices.len() > 1)
            .collect();
        groups.sort_by_key(|(_, indices)| indices[0]);

        groups
            .into_iter()
            .map(|(hash, indices)| DuplicateGroup {
                id: GroupId::Exact(*hash),
                files: self.records(indices),
            })
            .collect()
    }

    pub fn similarity_groups(&self) -> Vec<DuplicateGroup> {
        let mut groups: Vec<(&u64, &Vec<usize>)> = self
            .similarity_index
            .iter()
            .filter(|(_, indices)| indices.len() > 1)
            .collect();
        groups.sort_by_key(|(id, _)| **id);

        groups
            .into_iter()
            .map(|(id, indices)| DuplicateGroup {
                id: GroupId::Similar(*id),
                files: self.records(indices),
            })
            .collect()
    }

    /// Exact groups followed by similarity groups; never a group of fewer than two.
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        let mut groups = self.exact_groups();
        groups.extend(self.similarity_groups());
        groups
    }

    /// Files sharing a name, whatever their content.
    pub fn identical_names(&self) -> Vec<(String, Vec<FileRecord>)> {
        let mut names: Vec<(String, Vec<FileRecord>)> = self
            .name_index
            .iter()
            .filter(|(_, indices)| indices.len() > 1)
            .map(|(name, indices)| (name.clone(), self.records(indices)))
            .collect();
        names.sort_by(|a, b| a.0.cmp(&b.0));
        names
    }

    pub fn statistics(&self) -> ScanStatistics {
        let extra = |indices: &Vec<usize>| indices.len().saturating_sub(1);

        let exact: Vec<&Vec<usize>> = self
            .hash_index
            .values()
            .filter(|indices| indices.len() > 1)
            .collect();

        let wasted_bytes = exact
            .iter()
            .map(|indices| {
                indices[1..]
                    .iter()
                    .map(|&i| self.inventory[i].size)
                    .sum::<u64>()
            })
            .sum();

        ScanStatistics {
            total_files: self.inventory.len(),
            exact_duplicates: exact.iter().map(|indices| extra(indices)).sum(),
            similar_files: self.similarity_index.values().map(extra).sum(),
            identical_names: self.name_index.values().map(extra).sum(),
            duplicate_groups: exact.len(),
            similarity_groups: self
                .similarity_index
                .values()
                .filter(|indices| indices.len() > 1)
                .count(),
            wasted_bytes,
        }
    }
}

/// Iterator returned by [`ScanSession::hash_all`].
pub struct HashAll<'a> {
    session: &'a mut ScanSession,
    cursor: usize,
}

impl Iterator for HashAll<'_> {
    type Item = (FileRecord, ContentHash);

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.session.inventory.len() {
            let index = self.cursor;
            self.cursor += 1;

            let record = &self.session.inventory[index];
            if record.content_hash.is_some() {
                continue;
            }

            match hasher::hash_file(&record.path) {
                Ok(hash) => {
                    self.session.record_hash(index, hash);
                    return Some((self.session.inventory[index].clone(), hash));
                }
                Err(e) => warn!("Skipping: {}", e),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.session.inventory.len() - self.cursor))
    }
}
