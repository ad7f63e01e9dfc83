//! Real, network/process-backed implementations of the three acquisition
//! traits. Each pairs with the in-memory/no-op doubles in
//! [`crate::traits::test_utils`] for tests.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::errors::{AcquisitionError, StoreError};
use crate::traits::{LoudnessNormalizer, ObjectMeta, ObjectStore, RemoteSearch};

/// REST-style object store: a base URL plus a bucket name, `PUT`/`HEAD`/
/// `DELETE` over plain HTTP(S). Fits any S3-compatible gateway that accepts
/// unsigned (or reverse-proxy-authenticated) requests at `<base>/<bucket>/<key>`.
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
}

impl HttpObjectStore {
    #[must_use]
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), bucket: bucket.into() }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{key}", self.base_url.trim_end_matches('/'), self.bucket)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn key_exists(&self, key: &str) -> Result<bool, StoreError> {
        let resp = self.client.head(self.object_url(key)).send().await?;
        Ok(resp.status().is_success())
    }

    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
        cache_control: &str,
        metadata: Value,
    ) -> Result<(), StoreError> {
        let bytes = tokio::fs::read(local_path).await?;
        let meta_header = metadata.to_string();
        let resp = self
            .client
            .put(self.object_url(key))
            .header("content-type", content_type)
            .header("cache-control", cache_control)
            .header("x-object-metadata", meta_header)
            .body(bytes)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("upload to {key} rejected: {}", resp.status())))
        }
    }

    async fn head(&self, key: &str) -> Result<ObjectMeta, StoreError> {
        let resp = self.client.head(self.object_url(key)).send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let size_bytes = resp.content_length().unwrap_or(0);
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        Ok(ObjectMeta { key: key.to_string(), size_bytes, content_type })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let resp = self.client.delete(self.object_url(key)).send().await?;
        if resp.status().is_success() || resp.status().as_u16() == 404 {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("delete of {key} rejected: {}", resp.status())))
        }
    }

    fn public_url(&self, key: &str) -> String {
        self.object_url(key)
    }
}

/// Queries a configured search endpoint for the single best match and
/// streams its audio to `dest`.
pub struct HttpRemoteSearch {
    client: reqwest::Client,
    search_endpoint: String,
}

impl HttpRemoteSearch {
    #[must_use]
    pub fn new(search_endpoint: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), search_endpoint: search_endpoint.into() }
    }
}

#[async_trait]
impl RemoteSearch for HttpRemoteSearch {
    async fn search_and_download(&self, query: &str, dest: &Path) -> Result<(), AcquisitionError> {
        let search_resp = self.client.get(&self.search_endpoint).query(&[("q", query)]).send().await?;
        if !search_resp.status().is_success() {
            return Err(AcquisitionError::NoMatchFound(query.to_string()));
        }
        let download_url: String = search_resp.text().await?;
        if download_url.is_empty() {
            return Err(AcquisitionError::NoMatchFound(query.to_string()));
        }

        let mut download_resp = self.client.get(download_url.trim()).send().await?;
        if !download_resp.status().is_success() {
            return Err(AcquisitionError::NoMatchFound(query.to_string()));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = download_resp.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

/// Invokes an external `ffmpeg` with the EBU R128 `loudnorm` filter tuned to
/// §4.5's targets, re-encoding to 320 kbps MP3 at 44.1 kHz.
pub struct FfmpegLoudnessNormalizer {
    integrated_lufs: f64,
    true_peak_dbtp: f64,
    loudness_range_lu: f64,
    output_bitrate_kbps: u32,
    output_sample_rate_hz: u32,
}

impl FfmpegLoudnessNormalizer {
    #[must_use]
    pub fn new(
        integrated_lufs: f64,
        true_peak_dbtp: f64,
        loudness_range_lu: f64,
        output_bitrate_kbps: u32,
        output_sample_rate_hz: u32,
    ) -> Self {
        Self { integrated_lufs, true_peak_dbtp, loudness_range_lu, output_bitrate_kbps, output_sample_rate_hz }
    }
}

#[async_trait]
impl LoudnessNormalizer for FfmpegLoudnessNormalizer {
    async fn normalize(&self, input: &Path, output: &Path) -> Result<(), AcquisitionError> {
        let filter = format!(
            "loudnorm=I={}:TP={}:LRA={}",
            self.integrated_lufs, self.true_peak_dbtp, self.loudness_range_lu
        );
        let status = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-af")
            .arg(filter)
            .arg("-ar")
            .arg(self.output_sample_rate_hz.to_string())
            .arg("-b:a")
            .arg(format!("{}k", self.output_bitrate_kbps))
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(AcquisitionError::NormalisationFailed(format!("ffmpeg exited with {status}")))
        }
    }
}
