//! Bookkeeping of every side effect a registration pass creates.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::emitter::handlers::{ActionHandler, FilterHandler, InitHandler};
use crate::scheduler::ScheduledJob;

/// One reversible registration side effect.
pub enum LedgerEntry {
    /// A filter subscription on the host event bus.
    Filter {
        /// Event name.
        event: String,
        /// The subscribed handler, used for identity on removal.
        handler: Arc<dyn FilterHandler>,
    },
    /// An action subscription on the host event bus.
    Action {
        /// Event name.
        event: String,
        /// The subscribed handler.
        handler: Arc<dyn ActionHandler>,
    },
    /// An init subscription on the host event bus.
    Init {
        /// Event name.
        event: String,
        /// The subscribed handler.
        handler: Arc<dyn InitHandler>,
    },
    /// A running scheduled job.
    Schedule {
        /// Handle used to stop the job.
        job: Box<dyn ScheduledJob>,
    },
    /// A module held in the module cache.
    LoadedModule {
        /// Resolved path used as the cache key.
        path: PathBuf,
    },
}

impl LedgerEntry {
    /// Short tag naming the entry's variant.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Filter { .. } => "filter",
            Self::Action { .. } => "action",
            Self::Init { .. } => "init",
            Self::Schedule { .. } => "schedule",
            Self::LoadedModule { .. } => "loaded_module",
        }
    }
}

impl fmt::Debug for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter { event, .. } | Self::Action { event, .. } | Self::Init { event, .. } => f
                .debug_struct(self.tag())
                .field("event", event)
                .finish_non_exhaustive(),
            Self::Schedule { job } => f.debug_struct("schedule").field("key", &job.key()).finish(),
            Self::LoadedModule { path } => f.debug_struct("loaded_module").field("path", path).finish(),
        }
    }
}

/// Per-variant entry counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCounts {
    pub filters: usize,
    pub actions: usize,
    pub inits: usize,
    pub schedules: usize,
    pub modules: usize,
}

/// Ordered list of registration side effects awaiting teardown.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    /// Removes and returns every entry, in recording order.
    pub fn drain(&mut self) -> Vec<LedgerEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts entries per variant.
    pub fn counts(&self) -> LedgerCounts {
        let mut counts = LedgerCounts::default();
        for entry in &self.entries {
            match entry {
                LedgerEntry::Filter { .. } => counts.filters += 1,
                LedgerEntry::Action { .. } => counts.actions += 1,
                LedgerEntry::Init { .. } => counts.inits += 1,
                LedgerEntry::Schedule { .. } => counts.schedules += 1,
                LedgerEntry::LoadedModule { .. } => counts.modules += 1,
            }
        }
        counts
    }

    /// Resolved paths of every loaded module entry.
    pub fn loaded_modules(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                LedgerEntry::LoadedModule { path } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}
