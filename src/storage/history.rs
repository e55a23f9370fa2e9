//! History/reuse store
//!
//! On success the supervisor records the final (goal, plan, run) triple.
//! Later compilations may consult the store for a plan that previously
//! succeeded on a similar goal (same target host and field set); the result
//! feeds in as preference hints only, never as a correctness requirement.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::domain::goal::GoalSpec;
use crate::domain::plan::Plan;
use crate::domain::run::RunRecord;
use crate::error::{Result, WeavrError};

/// One archived success
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub goal: GoalSpec,
    pub plan: Plan,
    pub run: RunRecord,
}

impl HistoryEntry {
    /// Similarity used for reuse: same primary host and same field set
    pub fn matches(&self, goal: &GoalSpec) -> bool {
        if self.goal.primary_host() != goal.primary_host() {
            return false;
        }
        let mut ours: Vec<&str> = self.goal.field_names();
        let mut theirs: Vec<&str> = goal.field_names();
        ours.sort_unstable();
        theirs.sort_unstable();
        ours == theirs
    }
}

/// Archive of succeeded (goal, plan, run) triples
pub trait HistoryStore: Send + Sync {
    /// Record one success
    fn record(&self, entry: &HistoryEntry) -> Result<()>;

    /// Most recent entry whose goal is similar to the given one
    fn find_similar(&self, goal: &GoalSpec) -> Result<Option<HistoryEntry>>;
}

/// JSONL-backed history store
pub struct JsonlHistoryStore {
    path: PathBuf,
    cache: RwLock<Option<Vec<HistoryEntry>>>,
}

impl JsonlHistoryStore {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base)?;
        Ok(Self {
            path: base.join("history.jsonl"),
            cache: RwLock::new(None),
        })
    }

    fn ensure_loaded(&self) -> Result<()> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|e| WeavrError::Storage(e.to_string()))?;
            if cache.is_some() {
                return Ok(());
            }
        }

        let mut cache = self
            .cache
            .write()
            .map_err(|e| WeavrError::Storage(e.to_string()))?;
        if cache.is_some() {
            return Ok(());
        }

        let mut entries = Vec::new();
        if self.path.exists() {
            let file = File::open(&self.path)?;
            let reader = BufReader::new(file);
            for line in reader.lines() {
                let line = line?;
                if !line.trim().is_empty() {
                    entries.push(serde_json::from_str(&line)?);
                }
            }
        }
        *cache = Some(entries);
        Ok(())
    }
}

impl HistoryStore for JsonlHistoryStore {
    fn record(&self, entry: &HistoryEntry) -> Result<()> {
        self.ensure_loaded()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(entry)?)?;

        let mut cache = self
            .cache
            .write()
            .map_err(|e| WeavrError::Storage(e.to_string()))?;
        if let Some(entries) = cache.as_mut() {
            entries.push(entry.clone());
        }
        Ok(())
    }

    fn find_similar(&self, goal: &GoalSpec) -> Result<Option<HistoryEntry>> {
        self.ensure_loaded()?;
        let cache = self
            .cache
            .read()
            .map_err(|e| WeavrError::Storage(e.to_string()))?;
        Ok(cache
            .as_ref()
            .and_then(|entries| entries.iter().rev().find(|e| e.matches(goal)).cloned()))
    }
}

/// In-memory history store for tests
#[derive(Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn record(&self, entry: &HistoryEntry) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| WeavrError::Storage(e.to_string()))?;
        entries.push(entry.clone());
        Ok(())
    }

    fn find_similar(&self, goal: &GoalSpec) -> Result<Option<HistoryEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| WeavrError::Storage(e.to_string()))?;
        Ok(entries.iter().rev().find(|e| e.matches(goal)).cloned())
    }
}
