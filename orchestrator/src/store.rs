//! `JobStore`: an async CRUD seam over `AnalysisJob` and `Track` records.
//!
//! Persistence mechanics are explicitly out of scope; this ships only the
//! in-memory implementation the rest of the crate is built and tested
//! against, generalized from `mecomp_storage`'s free-function
//! `Song::read`/`Song::delete` style into an injectable trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mixcraft_core::model::{AnalysisJob, JobStatus, Track};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("job {0} not found")]
    JobNotFound(Uuid),
    #[error("track {0} not found")]
    TrackNotFound(String),
}

/// `#[async_trait]` so the boxed, `Send`-guaranteed future can be driven
/// from inside the `tokio::spawn`ed worker loop in `orchestrator.rs` — plain
/// async-fn-in-trait gives no such guarantee when the trait is used
/// generically.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: AnalysisJob) -> Result<(), StoreError>;
    async fn get_job(&self, id: Uuid) -> Result<AnalysisJob, StoreError>;
    async fn update_job(&self, job: AnalysisJob) -> Result<(), StoreError>;
    /// The most recent still-in-flight job for a playlist reference, if any
    /// (§9's dedup invariant / scenario S5).
    async fn find_in_flight_job(&self, playlist_ref: &str) -> Result<Option<AnalysisJob>, StoreError>;

    async fn upsert_track(&self, track: Track) -> Result<(), StoreError>;
    async fn get_track_by_catalogue_id(&self, catalogue_id: &str) -> Result<Option<Track>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<Uuid, AnalysisJob>>,
    tracks: Mutex<HashMap<String, Track>>,
}

impl InMemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert_job(&self, job: AnalysisJob) -> Result<(), StoreError> {
        self.jobs.lock().expect("lock poisoned").insert(job.id, job);
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<AnalysisJob, StoreError> {
        self.jobs.lock().expect("lock poisoned").get(&id).cloned().ok_or(StoreError::JobNotFound(id))
    }

    async fn update_job(&self, job: AnalysisJob) -> Result<(), StoreError> {
        self.jobs.lock().expect("lock poisoned").insert(job.id, job);
        Ok(())
    }

    async fn find_in_flight_job(&self, playlist_ref: &str) -> Result<Option<AnalysisJob>, StoreError> {
        let jobs = self.jobs.lock().expect("lock poisoned");
        Ok(jobs
            .values()
            .filter(|j| j.playlist_ref == playlist_ref && matches!(j.status, JobStatus::Pending | JobStatus::Processing))
            .max_by_key(|j| j.created_at)
            .cloned())
    }

    async fn upsert_track(&self, track: Track) -> Result<(), StoreError> {
        self.tracks.lock().expect("lock poisoned").insert(track.catalogue_id.clone(), track);
        Ok(())
    }

    async fn get_track_by_catalogue_id(&self, catalogue_id: &str) -> Result<Option<Track>, StoreError> {
        Ok(self.tracks.lock().expect("lock poisoned").get(catalogue_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixcraft_core::model::{JobCounters, JobOptions};
    use pretty_assertions::assert_eq;
    use time::OffsetDateTime;

    fn job(playlist_ref: &str, status: JobStatus) -> AnalysisJob {
        AnalysisJob {
            id: Uuid::new_v4(),
            playlist_ref: playlist_ref.to_string(),
            catalogue_playlist_id: None,
            playlist_name: None,
            status,
            counters: JobCounters::new(0),
            options: JobOptions {
                max_tracks: 50,
                skip_analysis_if_exists: true,
                auto_fetch: true,
                download_timeout_seconds: 300,
            },
            error_message: None,
            result: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            started_at: None,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn find_in_flight_job_ignores_terminal_jobs() {
        let store = InMemoryJobStore::new();
        store.insert_job(job("playlist-1", JobStatus::Completed)).await.unwrap();
        assert!(store.find_in_flight_job("playlist-1").await.unwrap().is_none());

        let pending = job("playlist-1", JobStatus::Pending);
        let id = pending.id;
        store.insert_job(pending).await.unwrap();
        let found = store.find_in_flight_job("playlist-1").await.unwrap().unwrap();
        assert_eq!(found.id, id);
    }
}
