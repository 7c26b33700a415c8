/// Trait for reporting scan progress.
///
/// The CLI implements it with indicatif bars; library callers can use
/// [`SilentReporter`]. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_progress(&self, _files_found: usize, _current_path: &str) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_hash_start(&self, _total_files: usize) {}
    fn on_hash_progress(&self, _files_hashed: usize, _total_files: usize) {}
    fn on_hash_complete(&self, _duplicate_groups: usize, _duration_secs: f64) {}
    fn on_similarity_start(&self) {}
    fn on_similarity_complete(&self, _similarity_groups: usize, _duration_secs: f64) {}

    /// Checked between files; returning true abandons the scan before the next one.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
