use std::path::PathBuf;

/// Default in-memory budget per run before it spills: 64 MiB.
pub const DEFAULT_MEMORY_BUDGET: usize = 64 * 1024 * 1024;

/// Settings shared by every run created from the same combiner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Buffered key + value bytes that trigger a spill to disk.
    pub memory_budget: usize,

    /// Directory for spill files. `None` uses the system temp directory.
    pub spill_dir: Option<PathBuf>,

    /// If `true`, spill files are fsynced before they are used.
    pub sync: bool,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A config that never spills.
    pub fn in_memory() -> Self {
        Self {
            memory_budget: usize::MAX,
            ..Self::default()
        }
    }

    pub fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget = bytes;
        self
    }

    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// The directory spill files are created in.
    pub fn resolved_spill_dir(&self) -> PathBuf {
        self.spill_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            memory_budget: DEFAULT_MEMORY_BUDGET,
            spill_dir: None,
            sync: false,
        }
    }
}
