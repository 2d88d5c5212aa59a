//! Job snapshot cache
//!
//! Keeps the last authoritative snapshot of each job so a session can be
//! reopened without connectivity.

use proofwork_core::domain::job::Job;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

use crate::error::CacheError;
use crate::service::persist::write_atomic;

/// Service trait for job snapshots
pub trait JobCache: Send + Sync {
    /// Returns the stored snapshot, or `None` if the job was never cached
    fn load(&self, job_id: Uuid) -> Result<Option<Job>, CacheError>;

    /// Replaces the stored snapshot of `job`
    fn store(&self, job: &Job) -> Result<(), CacheError>;

    /// IDs of every cached job
    fn job_ids(&self) -> Result<Vec<Uuid>, CacheError>;
}

/// In-memory implementation of JobCache
#[derive(Default)]
pub struct InMemoryJobCache {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl InMemoryJobCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobCache for InMemoryJobCache {
    fn load(&self, job_id: Uuid) -> Result<Option<Job>, CacheError> {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(jobs.get(&job_id).cloned())
    }

    fn store(&self, job: &Job) -> Result<(), CacheError> {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn job_ids(&self) -> Result<Vec<Uuid>, CacheError> {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(jobs.keys().copied().collect())
    }
}

/// File-backed implementation of JobCache
///
/// One JSON document per job under `<dir>/<job_id>.json`.
pub struct FileJobCache {
    dir: PathBuf,
}

impl FileJobCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, job_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", job_id))
    }
}

impl JobCache for FileJobCache {
    fn load(&self, job_id: Uuid) -> Result<Option<Job>, CacheError> {
        let path = self.path_for(job_id);

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CacheError::Corrupt { path, source })
    }

    fn store(&self, job: &Job) -> Result<(), CacheError> {
        let path = self.path_for(job.id);
        let bytes = serde_json::to_vec_pretty(job).map_err(|source| CacheError::Corrupt {
            path: path.clone(),
            source,
        })?;

        write_atomic(&path, &bytes).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("Cached job {} at {}", job.id, path.display());
        Ok(())
    }

    fn job_ids(&self) -> Result<Vec<Uuid>, CacheError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CacheError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| Uuid::parse_str(stem).ok())
                {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
