//! `Orchestrator::submit`/`run_job`: the §4.6 state machine, dedup, and the
//! bounded worker pool that runs jobs one-at-a-time end to end.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use mixcraft_acquisition::rate_limit::DownloadRateLimiter;
use mixcraft_acquisition::traits::{LoudnessNormalizer, ObjectStore, RemoteSearch};
use mixcraft_core::errors::JobError;
use mixcraft_core::model::{AnalysisJob, JobCounters, JobOptions, JobResult, JobStatus};
use time::OffsetDateTime;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalogue::CatalogueProvider;
use crate::pipeline::run_track_pipeline;
use crate::store::JobStore;

struct Shared<S, O, R, L, C> {
    store: S,
    object_store: O,
    remote_search: R,
    normalizer: L,
    catalogue: C,
    rate_limiter: DownloadRateLimiter,
    key_prefix: String,
    local_cache_dir: PathBuf,
}

/// Runs jobs against injected collaborators. Construct with [`Orchestrator::new`],
/// which spawns `worker_pool_size` worker tasks that pull job ids off a
/// shared queue and run each to completion before taking the next one.
pub struct Orchestrator<S, O, R, L, C> {
    shared: Arc<Shared<S, O, R, L, C>>,
    cancellations: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
    sender: mpsc::Sender<Uuid>,
}

impl<S, O, R, L, C> Clone for Orchestrator<S, O, R, L, C> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared), cancellations: Arc::clone(&self.cancellations), sender: self.sender.clone() }
    }
}

impl<S, O, R, L, C> Orchestrator<S, O, R, L, C>
where
    S: JobStore + 'static,
    O: ObjectStore + 'static,
    R: RemoteSearch + 'static,
    L: LoudnessNormalizer + 'static,
    C: CatalogueProvider + 'static,
{
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        store: S,
        object_store: O,
        remote_search: R,
        normalizer: L,
        catalogue: C,
        downloads_per_minute: u32,
        key_prefix: String,
        local_cache_dir: PathBuf,
        worker_pool_size: usize,
    ) -> Self {
        let shared = Arc::new(Shared {
            store,
            object_store,
            remote_search,
            normalizer,
            catalogue,
            rate_limiter: DownloadRateLimiter::new(downloads_per_minute),
            key_prefix,
            local_cache_dir,
        });
        let cancellations: Arc<Mutex<HashMap<Uuid, CancellationToken>>> = Arc::new(Mutex::new(HashMap::new()));
        let (sender, receiver) = mpsc::channel::<Uuid>(256);
        let receiver = Arc::new(AsyncMutex::new(receiver));

        for worker in 0..worker_pool_size.max(1) {
            let shared = Arc::clone(&shared);
            let cancellations = Arc::clone(&cancellations);
            let receiver = Arc::clone(&receiver);
            tokio::spawn(async move {
                loop {
                    let job_id = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };
                    let Some(job_id) = job_id else { break };
                    let token = cancellations.lock().expect("lock poisoned").get(&job_id).cloned().unwrap_or_default();
                    info!(worker, %job_id, "starting job");
                    run_job(&shared, token, job_id).await;
                }
            });
        }

        Self { shared, cancellations, sender }
    }

    /// Submits a playlist reference for processing. Returns the existing
    /// in-flight job instead of starting a new one if one is already
    /// running for this reference (§4.6's dedup rule, scenario S5).
    pub async fn submit(&self, playlist_ref: &str, options: JobOptions) -> Result<AnalysisJob, JobError> {
        if let Some(existing) = self
            .shared
            .store
            .find_in_flight_job(playlist_ref)
            .await
            .map_err(|e| JobError::InternalError(e.to_string()))?
        {
            return Ok(existing);
        }

        let now = OffsetDateTime::now_utc();
        let job = AnalysisJob {
            id: Uuid::new_v4(),
            playlist_ref: playlist_ref.to_string(),
            catalogue_playlist_id: None,
            playlist_name: None,
            status: JobStatus::Pending,
            counters: JobCounters::new(0),
            options,
            error_message: None,
            result: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        };
        self.shared.store.insert_job(job.clone()).await.map_err(|e| JobError::InternalError(e.to_string()))?;
        self.cancellations.lock().expect("lock poisoned").insert(job.id, CancellationToken::new());

        self.sender
            .send(job.id)
            .await
            .map_err(|_| JobError::InternalError("worker pool channel closed".to_string()))?;

        Ok(job)
    }

    /// Cooperatively cancels a running or pending job; checked at track
    /// boundaries inside the sub-pipeline loop.
    pub fn cancel(&self, job_id: Uuid) {
        if let Some(token) = self.cancellations.lock().expect("lock poisoned").get(&job_id) {
            token.cancel();
        }
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<AnalysisJob, JobError> {
        self.shared.store.get_job(job_id).await.map_err(|e| JobError::InternalError(e.to_string()))
    }
}

async fn run_job<S, O, R, L, C>(shared: &Shared<S, O, R, L, C>, token: CancellationToken, job_id: Uuid)
where
    S: JobStore,
    O: ObjectStore,
    R: RemoteSearch,
    L: LoudnessNormalizer,
    C: CatalogueProvider,
{
    let Ok(mut job) = shared.store.get_job(job_id).await else {
        warn!(%job_id, "job vanished before it could start");
        return;
    };

    job.status = JobStatus::Processing;
    job.started_at = Some(OffsetDateTime::now_utc());
    job.updated_at = OffsetDateTime::now_utc();
    if shared.store.update_job(job.clone()).await.is_err() {
        return;
    }

    let outcome = run_job_body(shared, &token, &mut job).await;

    match outcome {
        Ok(()) => job.status = JobStatus::Completed,
        Err(e) => {
            job.status = JobStatus::Failed;
            job.error_message = Some(e.to_string());
        }
    }
    job.completed_at = Some(OffsetDateTime::now_utc());
    job.updated_at = job.completed_at.expect("just set");
    let _ = shared.store.update_job(job).await;
}

async fn run_job_body<S, O, R, L, C>(
    shared: &Shared<S, O, R, L, C>,
    token: &CancellationToken,
    job: &mut AnalysisJob,
) -> Result<(), JobError>
where
    S: JobStore,
    O: ObjectStore,
    R: RemoteSearch,
    L: LoudnessNormalizer,
    C: CatalogueProvider,
{
    let playlist_info = shared
        .catalogue
        .resolve_playlist(&job.playlist_ref)
        .await
        .map_err(|e| JobError::CatalogueUnavailable(e.to_string()))?;
    let catalogue_tracks = shared
        .catalogue
        .list_playlist_tracks(&job.playlist_ref)
        .await
        .map_err(|e| JobError::CatalogueUnavailable(e.to_string()))?;

    let capped: Vec<_> = catalogue_tracks.into_iter().take(job.options.max_tracks as usize).collect();
    job.catalogue_playlist_id = Some(job.playlist_ref.clone());
    job.playlist_name = Some(playlist_info.playlist_name.clone());
    job.counters = JobCounters::new(u32::try_from(capped.len()).unwrap_or(u32::MAX));

    let mut usable_tracks = Vec::new();
    for catalogue_track in &capped {
        if token.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let outcome = run_track_pipeline(
            catalogue_track,
            &shared.store,
            &shared.key_prefix,
            &shared.local_cache_dir,
            &shared.object_store,
            &shared.remote_search,
            &shared.normalizer,
            &shared.rate_limiter,
            job.options.skip_analysis_if_exists,
        )
        .await;

        if outcome.newly_downloaded {
            job.counters.downloaded += 1;
        }
        if outcome.acquisition_failed || outcome.analysis_failed {
            job.counters.failed += 1;
        }
        if outcome.track.is_analysed() {
            job.counters.analysed += 1;
            if outcome.track.has_usable_file() {
                usable_tracks.push(outcome.track);
            }
        }

        job.updated_at = OffsetDateTime::now_utc();
        let _ = shared.store.update_job(job.clone()).await;
    }

    if usable_tracks.len() >= 2 {
        let (plan, _all_options) = mixcraft_compat::default_plan(&usable_tracks);
        job.result = Some(JobResult { plan, playlist_info });
        Ok(())
    } else {
        Err(JobError::PlannerInfeasible)
    }
}
