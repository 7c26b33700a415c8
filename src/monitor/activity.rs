use chrono::{DateTime, Local};
use std::collections::VecDeque;
use tracing::{error, info};

/// Tracing target every activity entry is mirrored under.
pub const ACTIVITY_TARGET: &str = "dupe_scout::activity";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Started,
    Stopped,
    DuplicateDetected,
    NewFile,
    Organized,
    Error,
}

#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Local>,
    pub kind: ActivityKind,
    pub event: String,
}

impl ActivityEntry {
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Append-only log of monitor events. With a capacity set, the oldest entries
/// are evicted once it is full.
#[derive(Debug)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: Option<usize>,
}

impl ActivityLog {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.filter(|c| *c > 0),
        }
    }

    pub fn record(&mut self, kind: ActivityKind, event: impl Into<String>) {
        let event = event.into();
        match kind {
            ActivityKind::Error => error!(target: ACTIVITY_TARGET, kind = ?kind, "{}", event),
            _ => info!(target: ACTIVITY_TARGET, kind = ?kind, "{}", event),
        }

        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity {
                self.entries.pop_front();
            }
        }

        self.entries.push_back(ActivityEntry {
            timestamp: Local::now(),
            kind,
            event,
        });
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
