//! Content acquisition (C5): object-store cache check, local-cache
//! fallback, rate-limited remote search-and-download, loudness
//! normalisation, and object-store upload.

pub mod errors;
pub mod rate_limit;
pub mod remote;
pub mod sanitize;
pub mod traits;

use std::path::Path;

use log::warn;
use mixcraft_core::model::FileSource;

use rate_limit::DownloadRateLimiter;
use traits::{LoudnessNormalizer, ObjectStore, RemoteSearch};

/// The outcome of one [`acquire`] call. Mirrors the interface contract's
/// `{key_or_path, source, size, error}` record directly: acquisition never
/// panics or returns `Err`, it reports failure in `error` and marks the
/// track unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquisition {
    pub key_or_path: Option<String>,
    pub source: FileSource,
    pub size_bytes: Option<u64>,
    pub error: Option<String>,
}

impl Acquisition {
    fn unavailable(error: impl Into<String>) -> Self {
        Self { key_or_path: None, source: FileSource::Unavailable, size_bytes: None, error: Some(error.into()) }
    }
}

const CONTENT_TYPE: &str = "audio/mpeg";
const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Runs the full resolution order of §4.5 for one `(artist, title)` pair.
///
/// `key_prefix` is the configured object-store prefix (`"audio"` by
/// default); `local_cache_dir` is checked for a pre-populated file at
/// `<dir>/<sanitised artist>/<sanitised title>.mp3` before any network
/// access happens.
#[allow(clippy::too_many_arguments)]
pub async fn acquire<O, R, L>(
    artist: &str,
    title: &str,
    key_prefix: &str,
    local_cache_dir: &Path,
    object_store: &O,
    remote_search: &R,
    normalizer: &L,
    rate_limiter: &DownloadRateLimiter,
) -> Acquisition
where
    O: ObjectStore,
    R: RemoteSearch,
    L: LoudnessNormalizer,
{
    let deterministic_key = sanitize::deterministic_key(key_prefix, artist, title);

    match object_store.key_exists(&deterministic_key).await {
        Ok(true) => {
            let size_bytes = object_store.head(&deterministic_key).await.ok().map(|m| m.size_bytes);
            return Acquisition {
                key_or_path: Some(deterministic_key),
                source: FileSource::ObjectStore,
                size_bytes,
                error: None,
            };
        }
        Ok(false) => {}
        Err(e) => return Acquisition::unavailable(format!("object store unavailable: {e}")),
    }

    let local_path = local_cache_dir
        .join(sanitize::sanitize_component(artist))
        .join(format!("{}.mp3", sanitize::sanitize_component(title)));
    if let Ok(meta) = std::fs::metadata(&local_path) {
        if meta.len() > 0 {
            return Acquisition {
                key_or_path: Some(local_path.display().to_string()),
                source: FileSource::Local,
                size_bytes: Some(meta.len()),
                error: None,
            };
        }
    }

    download_and_upload(artist, title, key_prefix, object_store, remote_search, normalizer, rate_limiter).await
}

async fn download_and_upload<O, R, L>(
    artist: &str,
    title: &str,
    key_prefix: &str,
    object_store: &O,
    remote_search: &R,
    normalizer: &L,
    rate_limiter: &DownloadRateLimiter,
) -> Acquisition
where
    O: ObjectStore,
    R: RemoteSearch,
    L: LoudnessNormalizer,
{
    rate_limiter.acquire().await;

    let tmp_dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => return Acquisition::unavailable(format!("could not create temp directory: {e}")),
    };
    let downloaded = tmp_dir.path().join("downloaded.audio");
    let normalized = tmp_dir.path().join("normalized.mp3");

    let query = format!("{artist} {title}");
    if let Err(e) = remote_search.search_and_download(&query, &downloaded).await {
        return Acquisition::unavailable(format!("remote search failed: {e}"));
    }

    let normalized_path = match normalizer.normalize(&downloaded, &normalized).await {
        Ok(()) => normalized.as_path(),
        Err(e) => {
            warn!("loudness normalisation failed for {query:?}, uploading un-normalised source: {e}");
            downloaded.as_path()
        }
    };

    let size_bytes = match std::fs::metadata(normalized_path) {
        Ok(meta) => meta.len(),
        Err(e) => return Acquisition::unavailable(format!("downloaded file missing: {e}")),
    };

    let upload_key = sanitize::fresh_key(key_prefix, artist, title);
    let metadata = serde_json::json!({ "artist": artist, "title": title });
    if let Err(e) = object_store.upload(normalized_path, &upload_key, CONTENT_TYPE, CACHE_CONTROL, metadata).await {
        return Acquisition::unavailable(format!("upload failed: {e}"));
    }

    Acquisition { key_or_path: Some(upload_key), source: FileSource::ObjectStore, size_bytes: Some(size_bytes), error: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rate_limit::DownloadRateLimiter;
    use traits::test_utils::{InMemoryObjectStore, NoopLoudnessNormalizer, StubRemoteSearch};

    #[tokio::test]
    async fn returns_object_store_hit_without_touching_the_network() {
        let key = sanitize::deterministic_key("audio", "Daft Punk", "One More Time");
        let store = InMemoryObjectStore::seeded(&[&key]);
        let limiter = DownloadRateLimiter::new(20);
        let tmp = tempfile::tempdir().unwrap();
        let result = acquire(
            "Daft Punk",
            "One More Time",
            "audio",
            tmp.path(),
            &store,
            &StubRemoteSearch,
            &NoopLoudnessNormalizer,
            &limiter,
        )
        .await;
        assert_eq!(result.source, FileSource::ObjectStore);
        assert_eq!(result.key_or_path.as_deref(), Some(key.as_str()));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn falls_back_to_local_cache_when_object_store_misses() {
        let store = InMemoryObjectStore::new();
        let limiter = DownloadRateLimiter::new(20);
        let tmp = tempfile::tempdir().unwrap();
        let local_dir = tmp.path().join("daft_punk");
        std::fs::create_dir_all(&local_dir).unwrap();
        std::fs::write(local_dir.join("one_more_time.mp3"), [0_u8; 32]).unwrap();

        let result = acquire(
            "Daft Punk",
            "One More Time",
            "audio",
            tmp.path(),
            &store,
            &StubRemoteSearch,
            &NoopLoudnessNormalizer,
            &limiter,
        )
        .await;
        assert_eq!(result.source, FileSource::Local);
        assert_eq!(result.size_bytes, Some(32));
    }

    #[tokio::test]
    async fn downloads_normalises_and_uploads_under_a_fresh_key_on_full_miss() {
        let store = InMemoryObjectStore::new();
        let limiter = DownloadRateLimiter::new(20);
        let tmp = tempfile::tempdir().unwrap();

        let result = acquire(
            "Daft Punk",
            "One More Time",
            "audio",
            tmp.path(),
            &store,
            &StubRemoteSearch,
            &NoopLoudnessNormalizer,
            &limiter,
        )
        .await;
        assert_eq!(result.source, FileSource::ObjectStore);
        let key = result.key_or_path.expect("expected an uploaded key");
        assert!(key.starts_with("audio/daft_punk/one_more_time_"));
        assert!(key != sanitize::deterministic_key("audio", "Daft Punk", "One More Time"));
        assert!(store.key_exists(&key).await.unwrap());
    }
}
