use crate::config::{self, AppConfig};
use crate::error::Error;
use crate::model::{DuplicateGroup, ScanStatistics};
use crate::progress::ProgressReporter;
use crate::scanner::InventoryOptions;
use crate::session::ScanSession;
use crate::similarity::SimilarityChain;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct ScanEngine {
    config: AppConfig,
    chain: SimilarityChain,
}

#[derive(Debug)]
pub struct ScanResult {
    pub session: ScanSession,
    pub statistics: ScanStatistics,
    pub scan_duration: Duration,
    pub hash_duration: Duration,
    pub similarity_duration: Duration,
    /// Set when the reporter asked to stop; the session holds what was done.
    pub cancelled: bool,
}

impl ScanResult {
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        self.session.duplicate_groups()
    }
}

impl ScanEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            chain: SimilarityChain::default(),
        }
    }

    pub fn with_similarity_chain(mut self, chain: SimilarityChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the full duplicate detection pipeline:
    /// 1. Inventory every configured root
    /// 2. Hash each file, grouping exact duplicates
    /// 3. Compare same-named documents for near duplicates
    ///
    /// Every root is checked and canonicalized before any work starts, so two
    /// spellings of one directory are scanned once.
    pub fn scan(&self, reporter: &dyn ProgressReporter) -> Result<ScanResult, Error> {
        let mut canonical_roots = Vec::with_capacity(self.config.root_paths.len());
        for root in &self.config.root_paths {
            let root = Path::new(root);
            match fs::canonicalize(root) {
                Ok(canonical) if canonical.is_dir() => canonical_roots.push(canonical),
                _ => return Err(Error::InvalidPath(root.to_path_buf())),
            }
        }

        let roots = config::non_overlapping_directories(canonical_roots);
        if roots.is_empty() {
            return Err(Error::Other("no root paths configured".into()));
        }
        info!("Processing directories: {:?}", roots);

        let options = InventoryOptions::from_config(&self.config);
        let mut session = ScanSession::new(self.config.threshold());

        // Phase 1: Inventory
        reporter.on_scan_start();
        let scan_start = Instant::now();
        for root in &roots {
            session.build_inventory(root, &options)?;
            reporter.on_scan_progress(session.inventory().len(), &display(root));
        }
        let scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(session.inventory().len(), scan_duration.as_secs_f64());

        // Phase 2: Hash
        let total = session.unhashed_count();
        reporter.on_hash_start(total);
        let hash_start = Instant::now();
        let mut cancelled = false;
        for (hashed, _) in session.hash_all().enumerate() {
            reporter.on_hash_progress(hashed + 1, total);
            if reporter.is_cancelled() {
                cancelled = true;
                break;
            }
        }
        let hash_duration = hash_start.elapsed();
        let exact_groups = session.statistics().duplicate_groups;
        reporter.on_hash_complete(exact_groups, hash_duration.as_secs_f64());
        debug!(
            "Hash completed in {:.2}s, {} duplicate groups",
            hash_duration.as_secs_f64(),
            exact_groups
        );

        // Phase 3: Similarity
        let mut similarity_duration = Duration::ZERO;
        if cancelled {
            info!("Scan cancelled, skipping similarity pass");
        } else {
            reporter.on_similarity_start();
            let similarity_start = Instant::now();
            session.group_similar(&self.chain);
            similarity_duration = similarity_start.elapsed();
            reporter.on_similarity_complete(
                session.statistics().similarity_groups,
                similarity_duration.as_secs_f64(),
            );
        }

        let statistics = session.statistics();
        info!(
            "{} files, {} duplicate groups, {} similarity groups, {} bytes wasted",
            statistics.total_files,
            statistics.duplicate_groups,
            statistics.similarity_groups,
            statistics.wasted_bytes
        );

        Ok(ScanResult {
            session,
            statistics,
            scan_duration,
            hash_duration,
            similarity_duration,
            cancelled,
        })
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
