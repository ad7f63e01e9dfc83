//! The per-track sub-pipeline of §4.6.1: upsert, acquire if needed, analyse
//! if needed, advance counters. Per-track failures are non-fatal; they
//! advance `failed` and leave the track's analysis untouched rather than
//! aborting the job.

use std::path::{Path, PathBuf};

use mixcraft_analysis::decoder::{Decoder, MixDecoder};
use mixcraft_analysis::Analysis;
use mixcraft_core::model::{CatalogueMetadata, FileSource, Track};
use time::OffsetDateTime;

use mixcraft_acquisition::rate_limit::DownloadRateLimiter;
use mixcraft_acquisition::traits::{LoudnessNormalizer, ObjectStore, RemoteSearch};
use mixcraft_acquisition::{acquire, Acquisition};

use crate::catalogue::CatalogueTrack;
use crate::store::JobStore;

const ANALYSIS_VERSION: u32 = 1;

/// Outcome of one track's pass through the sub-pipeline, folded into the
/// job's counters by the caller.
pub struct TrackOutcome {
    pub track: Track,
    pub newly_downloaded: bool,
    pub newly_analysed: bool,
    pub acquisition_failed: bool,
    pub analysis_failed: bool,
}

#[allow(clippy::too_many_arguments)]
pub async fn run_track_pipeline<S, O, R, L>(
    catalogue_track: &CatalogueTrack,
    store: &S,
    key_prefix: &str,
    local_cache_dir: &Path,
    object_store: &O,
    remote_search: &R,
    normalizer: &L,
    rate_limiter: &DownloadRateLimiter,
    skip_analysis_if_exists: bool,
) -> TrackOutcome
where
    S: JobStore,
    O: ObjectStore,
    R: RemoteSearch,
    L: LoudnessNormalizer,
{
    let mut track = match store.get_track_by_catalogue_id(&catalogue_track.catalogue_id).await {
        Ok(Some(existing)) => existing,
        _ => Track {
            id: uuid::Uuid::new_v4(),
            catalogue_id: catalogue_track.catalogue_id.clone(),
            metadata: CatalogueMetadata {
                title: catalogue_track.title.clone(),
                artist: catalogue_track.artist.clone(),
                album: catalogue_track.album.clone(),
                duration_ms: catalogue_track.duration_ms,
                popularity: catalogue_track.popularity,
                preview_url: catalogue_track.preview_url.clone(),
            },
            file_source: FileSource::Unavailable,
            file_pointer: None,
            file_size_bytes: None,
            analysis: Analysis::default(),
        },
    };

    let mut newly_downloaded = false;
    let mut acquisition_failed = false;

    if !track.has_usable_file() {
        let result = acquire(
            &catalogue_track.artist,
            &catalogue_track.title,
            key_prefix,
            local_cache_dir,
            object_store,
            remote_search,
            normalizer,
            rate_limiter,
        )
        .await;

        apply_acquisition(&mut track, &result);
        acquisition_failed = track.file_source == FileSource::Unavailable;
        newly_downloaded = !acquisition_failed && track.file_source == FileSource::ObjectStore;
    }

    let mut newly_analysed = false;
    let mut analysis_failed = false;

    if track.has_usable_file() {
        let skip = skip_analysis_if_exists && track.analysis.analyzed_at.is_some();
        if !skip {
            match decode_and_analyze(&track, object_store).await {
                Ok(analysis) => {
                    track.analysis = analysis;
                    newly_analysed = true;
                }
                Err(message) => {
                    analysis_failed = true;
                    track.analysis.analysis_error.push(message);
                }
            }
        }
    }

    let _ = store.upsert_track(track.clone()).await;

    TrackOutcome { track, newly_downloaded, newly_analysed, acquisition_failed, analysis_failed }
}

fn apply_acquisition(track: &mut Track, result: &Acquisition) {
    track.file_source = result.source;
    track.file_pointer.clone_from(&result.key_or_path);
    track.file_size_bytes = result.size_bytes;
}

async fn decode_and_analyze<O: ObjectStore>(track: &Track, object_store: &O) -> Result<Analysis, String> {
    let local_path = match track.file_source {
        FileSource::Local => PathBuf::from(track.file_pointer.as_ref().ok_or("local track has no path")?),
        FileSource::ObjectStore => {
            let key = track.file_pointer.as_ref().ok_or("object-store track has no key")?;
            fetch_to_temp(object_store, key).await.map_err(|e| e.to_string())?
        }
        FileSource::RemoteVideo | FileSource::Unavailable => {
            return Err("no decodable file for this source".to_string());
        }
    };

    let path_for_blocking = local_path.clone();
    let analysis = tokio::task::spawn_blocking(move || MixDecoder.analyze_path(&path_for_blocking))
        .await
        .map_err(|e| format!("decode task panicked: {e}"))?
        .map_err(|e| e.to_string())?;

    Ok(Analysis { analysis_version: ANALYSIS_VERSION, analyzed_at: Some(OffsetDateTime::now_utc()), ..analysis })
}

async fn fetch_to_temp<O: ObjectStore>(object_store: &O, key: &str) -> Result<PathBuf, std::io::Error> {
    let url = object_store.public_url(key);
    let tmp = tempfile::Builder::new().suffix(".audio").tempfile()?;
    let (_, path) = tmp.keep().map_err(|e| e.error)?;

    let bytes = reqwest::get(&url)
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| std::io::Error::other(e.to_string()))?
        .bytes()
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}
