//! Persistence for jobs and the success history
//!
//! JSONL-backed stores with in-memory caching: jobs are upserted by
//! `job_id` (latest record wins on load) so a crashed supervisor can resume
//! without re-running completed stages; succeeded (goal, plan, run) triples
//! land in the history store, consulted later as a hint source.

pub mod history;

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::domain::job::Job;
use crate::error::{Result, WeavrError};

pub use history::{HistoryEntry, HistoryStore, JsonlHistoryStore, MemoryHistoryStore};

/// Store for job records keyed by `job_id`
pub trait JobStore: Send + Sync {
    /// Insert or replace a job record
    fn put(&self, job: &Job) -> Result<()>;

    /// Fetch a job by id
    fn get(&self, job_id: &str) -> Result<Option<Job>>;

    /// All jobs, oldest first
    fn list(&self) -> Result<Vec<Job>>;
}

/// JSONL-backed job store with in-memory caching
///
/// Every `put` appends one line; on load, later lines for the same job_id
/// supersede earlier ones, so the file doubles as a transition log.
pub struct JsonlJobStore {
    path: PathBuf,
    cache: RwLock<Option<Vec<Job>>>,
}

impl JsonlJobStore {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self {
            path: base.join("jobs.jsonl"),
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

        let mut jobs: Vec<Job> = Vec::new();
        if self.path.exists() {
            let file = File::open(&self.path)?;
            let reader = BufReader::new(file);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let job: Job = serde_json::from_str(&line)?;
                // Latest record for a job_id wins
                if let Some(existing) = jobs.iter_mut().find(|j| j.job_id == job.job_id) {
                    *existing = job;
                } else {
                    jobs.push(job);
                }
            }
        }

        *cache = Some(jobs);
        Ok(())
    }

    fn append_to_file(&self, job: &Job) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(job)?)?;
        Ok(())
    }
}

impl JobStore for JsonlJobStore {
    fn put(&self, job: &Job) -> Result<()> {
        self.ensure_loaded()?;

        // Append to file first (source of truth), then update cache
        self.append_to_file(job)?;

        let mut cache = self
            .cache
            .write()
            .map_err(|e| WeavrError::Storage(e.to_string()))?;
        let jobs = cache
            .as_mut()
            .ok_or_else(|| WeavrError::Storage("job cache not loaded".to_string()))?;
        if let Some(existing) = jobs.iter_mut().find(|j| j.job_id == job.job_id) {
            *existing = job.clone();
        } else {
            jobs.push(job.clone());
        }
        Ok(())
    }

    fn get(&self, job_id: &str) -> Result<Option<Job>> {
        self.ensure_loaded()?;
        let cache = self
            .cache
            .read()
            .map_err(|e| WeavrError::Storage(e.to_string()))?;
        Ok(cache
            .as_ref()
            .and_then(|jobs| jobs.iter().find(|j| j.job_id == job_id).cloned()))
    }

    fn list(&self) -> Result<Vec<Job>> {
        self.ensure_loaded()?;
        let cache = self
            .cache
            .read()
            .map_err(|e| WeavrError::Storage(e.to_string()))?;
        Ok(cache.as_ref().cloned().unwrap_or_default())
    }
}

/// In-memory job store for tests
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn put(&self, job: &Job) -> Result<()> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|e| WeavrError::Storage(e.to_string()))?;
        jobs.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    fn get(&self, job_id: &str) -> Result<Option<Job>> {
        let jobs = self
            .jobs
            .read()
            .map_err(|e| WeavrError::Storage(e.to_string()))?;
        Ok(jobs.get(job_id).cloned())
    }

    fn list(&self) -> Result<Vec<Job>> {
        let jobs = self
            .jobs
            .read()
            .map_err(|e| WeavrError::Storage(e.to_string()))?;
        let mut all: Vec<Job> = jobs.values().cloned().collect();
        all.sort_by_key(|j| j.created_at);
        Ok(all)
    }
}
