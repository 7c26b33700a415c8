pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod model;
pub mod monitor;
pub mod organize;
pub mod platform;
pub mod progress;
pub mod scanner;
pub mod session;
pub mod similarity;

pub use config::AppConfig;
pub use engine::{ScanEngine, ScanResult};
pub use error::Error;
pub use model::{ContentHash, DuplicateGroup, FileRecord, GroupId, GroupKind, ScanStatistics};
pub use monitor::{ActivityEntry, ActivityKind, FileMonitor, MonitorOptions, MonitorState};
pub use progress::{ProgressReporter, SilentReporter};
pub use session::ScanSession;
pub use similarity::SimilarityChain;
