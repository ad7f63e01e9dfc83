//! External-interface seams for content acquisition.
//!
//! Each trait ships a real implementation plus a `test_utils`-gated
//! in-memory/no-op double, mirroring the teacher's `mock_playback`
//! feature-gated substitution idiom rather than trait-object injection —
//! callers are generic over the trait, not boxing it.
//!
//! All three are `#[async_trait]`: the orchestrator's worker pool spawns
//! `run_job` onto `tokio::spawn`, which requires the future to be `Send`.
//! Native `async fn`-in-trait gives the returned future no `Send` guarantee
//! when the trait is used generically (the `Send + Sync` bound below is on
//! `Self`, not on the method's future) — `async_trait` boxes the future as
//! `Pin<Box<dyn Future<Output = _> + Send>>` instead, which closes that gap.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{AcquisitionError, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size_bytes: u64,
    pub content_type: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn key_exists(&self, key: &str) -> Result<bool, StoreError>;
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
        cache_control: &str,
        metadata: Value,
    ) -> Result<(), StoreError>;
    async fn head(&self, key: &str) -> Result<ObjectMeta, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    fn public_url(&self, key: &str) -> String;
}

#[async_trait]
pub trait RemoteSearch: Send + Sync {
    async fn search_and_download(&self, query: &str, dest: &Path) -> Result<(), AcquisitionError>;
}

#[async_trait]
pub trait LoudnessNormalizer: Send + Sync {
    async fn normalize(&self, input: &Path, output: &Path) -> Result<(), AcquisitionError>;
}

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{AcquisitionError, ObjectMeta, Path, StoreError, Value};

    /// In-memory `ObjectStore`: keys are recorded, no bytes are actually
    /// moved. Good enough to exercise the resolution order in tests.
    #[derive(Default)]
    pub struct InMemoryObjectStore {
        objects: Mutex<HashMap<String, ObjectMeta>>,
    }

    impl InMemoryObjectStore {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn seeded(keys: &[&str]) -> Self {
            let store = Self::new();
            let mut objects = store.objects.lock().expect("lock poisoned");
            for key in keys {
                objects.insert(
                    (*key).to_string(),
                    ObjectMeta { key: (*key).to_string(), size_bytes: 1, content_type: "audio/mpeg".to_string() },
                );
            }
            drop(objects);
            store
        }
    }

    #[async_trait::async_trait]
    impl super::ObjectStore for InMemoryObjectStore {
        async fn key_exists(&self, key: &str) -> Result<bool, StoreError> {
            Ok(self.objects.lock().expect("lock poisoned").contains_key(key))
        }

        async fn upload(
            &self,
            local_path: &Path,
            key: &str,
            content_type: &str,
            _cache_control: &str,
            _metadata: Value,
        ) -> Result<(), StoreError> {
            let size_bytes = std::fs::metadata(local_path).map(|m| m.len()).unwrap_or(0);
            self.objects.lock().expect("lock poisoned").insert(
                key.to_string(),
                ObjectMeta { key: key.to_string(), size_bytes, content_type: content_type.to_string() },
            );
            Ok(())
        }

        async fn head(&self, key: &str) -> Result<ObjectMeta, StoreError> {
            self.objects
                .lock()
                .expect("lock poisoned")
                .get(key)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(key.to_string()))
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.objects.lock().expect("lock poisoned").remove(key);
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            format!("memory://{key}")
        }
    }

    /// Writes a fixed amount of silence to `dest`; never fails.
    pub struct StubRemoteSearch;

    #[async_trait::async_trait]
    impl super::RemoteSearch for StubRemoteSearch {
        async fn search_and_download(&self, _query: &str, dest: &Path) -> Result<(), AcquisitionError> {
            std::fs::write(dest, [0_u8; 16])?;
            Ok(())
        }
    }

    /// Copies the input straight through without touching loudness.
    pub struct NoopLoudnessNormalizer;

    #[async_trait::async_trait]
    impl super::LoudnessNormalizer for NoopLoudnessNormalizer {
        async fn normalize(&self, input: &Path, output: &Path) -> Result<(), AcquisitionError> {
            std::fs::copy(input, output)?;
            Ok(())
        }
    }
}
