use dupe_scout::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Inventory phase: spinner (unknown total files upfront)
/// - Hash phase: progress bar (total files known from inventory)
/// - Similarity phase: spinner
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn spinner(&self, message: &'static str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars(TICK_CHARS),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self) {
        self.spinner("Inventorying files (excluding trash and system folders)...");
    }

    fn on_scan_progress(&self, files_found: usize, current_path: &str) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_message(format!(
                "Inventorying... {} files found ({})",
                files_found, current_path
            ));
        }
    }

    fn on_scan_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Inventory complete: {} files in {:.2}s",
            total_files, duration_secs
        );
    }

    fn on_hash_start(&self, total_files: usize) {
        let pb = ProgressBar::new(total_files as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Hashing [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
            )
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_hash_progress(&self, files_hashed: usize, total_files: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            if pb.length() != Some(total_files as u64) {
                pb.set_length(total_files as u64);
            }
            pb.set_position(files_hashed as u64);
        }
    }

    fn on_hash_complete(&self, duplicate_groups: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Hash complete: {} duplicate groups in {:.2}s",
            duplicate_groups, duration_secs
        );
    }

    fn on_similarity_start(&self) {
        self.spinner("Comparing same-name documents...");
    }

    fn on_similarity_complete(&self, similarity_groups: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Similarity complete: {} similar groups in {:.2}s",
            similarity_groups, duration_secs
        );
    }
}
