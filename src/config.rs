use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 1.0;
pub const DEFAULT_ORGANIZE_FOLDER: &str = "Auto_Organized";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub root_paths: Vec<String>,
    #[serde(default = "default_true")]
    pub recursive: bool,
    /// Extension allow-list, empty means every file.
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default = "default_true")]
    pub auto_organize: bool,
    #[serde(default)]
    pub organize_path: Option<String>,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Maximum retained activity entries; 0 keeps everything.
    #[serde(default = "default_activity_log_capacity")]
    pub activity_log_capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_activity_log_capacity() -> usize {
    10_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_paths: Vec::new(),
            recursive: true,
            extensions: Vec::new(),
            ignore_patterns: Vec::new(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            monitor: MonitorConfig::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            directory: None,
            auto_organize: true,
            organize_path: None,
            settle_delay_ms: default_settle_delay_ms(),
            activity_log_capacity: default_activity_log_capacity(),
        }
    }
}

impl AppConfig {
    /// Threshold clamped into [0, 1]; NaN falls back to the default.
    pub fn threshold(&self) -> f64 {
        if self.similarity_threshold.is_nan() {
            DEFAULT_SIMILARITY_THRESHOLD
        } else {
            self.similarity_threshold.clamp(0.0, 1.0)
        }
    }
}

impl MonitorConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Organize destination for a watched directory, `<dir>/Auto_Organized` unless set.
    pub fn organize_dir(&self, watched: &Path) -> PathBuf {
        match &self.organize_path {
            Some(path) => PathBuf::from(path),
            None => watched.join(DEFAULT_ORGANIZE_FOLDER),
        }
    }

    pub fn log_capacity(&self) -> Option<usize> {
        match self.activity_log_capacity {
            0 => None,
            n => Some(n),
        }
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("DUPE_SCOUT").separator("__"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Remove directories that are subdirectories of other directories in the list.
///
/// Comparison is by path components, so callers should pass canonical paths.
pub fn non_overlapping_directories(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for dir in dirs {
        if result.iter().any(|kept| dir.starts_with(kept)) {
            continue;
        }

        result.retain(|kept| !kept.starts_with(&dir));
        result.push(dir);
    }

    result
}
