//! `CatalogueProvider`: resolves a playlist reference to its metadata and
//! track list. The only non-opaque external interface of §6 that the
//! orchestrator, rather than acquisition, talks to directly.

use async_trait::async_trait;
use mixcraft_core::model::PlaylistInfo;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("playlist {0:?} not found")]
    NotFound(String),
    #[error("catalogue transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed catalogue response: {0}")]
    Malformed(String),
}

/// A track as the catalogue provider describes it, before it becomes a
/// `mixcraft_core::model::Track` (which additionally carries a file pointer
/// and analysis block this provider knows nothing about).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogueTrack {
    pub catalogue_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub popularity: Option<u32>,
    pub preview_url: Option<String>,
}

#[async_trait]
pub trait CatalogueProvider: Send + Sync {
    async fn resolve_playlist(&self, reference: &str) -> Result<PlaylistInfo, CatalogueError>;
    async fn list_playlist_tracks(&self, id: &str) -> Result<Vec<CatalogueTrack>, CatalogueError>;
}

/// REST-backed implementation: `GET <base>/playlists/<reference>` for
/// resolution, `GET <base>/playlists/<id>/tracks` for the track list.
pub struct HttpCatalogueProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogueProvider {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }
}

#[derive(Deserialize)]
struct PlaylistInfoResponse {
    name: String,
    owner: String,
    is_public: bool,
}

#[async_trait]
impl CatalogueProvider for HttpCatalogueProvider {
    async fn resolve_playlist(&self, reference: &str) -> Result<PlaylistInfo, CatalogueError> {
        let url = format!("{}/playlists/{reference}", self.base_url.trim_end_matches('/'));
        let resp = self.client.get(&url).send().await?;
        if resp.status().as_u16() == 404 {
            return Err(CatalogueError::NotFound(reference.to_string()));
        }
        let body: PlaylistInfoResponse =
            resp.json().await.map_err(|e| CatalogueError::Malformed(e.to_string()))?;
        Ok(PlaylistInfo { playlist_name: body.name, playlist_owner: body.owner, is_public: body.is_public })
    }

    async fn list_playlist_tracks(&self, id: &str) -> Result<Vec<CatalogueTrack>, CatalogueError> {
        let url = format!("{}/playlists/{id}/tracks", self.base_url.trim_end_matches('/'));
        let resp = self.client.get(&url).send().await?;
        if resp.status().as_u16() == 404 {
            return Err(CatalogueError::NotFound(id.to_string()));
        }
        resp.json().await.map_err(|e| CatalogueError::Malformed(e.to_string()))
    }
}

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils {
    use std::collections::HashMap;

    use super::{CatalogueError, CatalogueProvider, CatalogueTrack, PlaylistInfo};

    #[derive(Default)]
    pub struct InMemoryCatalogueProvider {
        playlists: HashMap<String, PlaylistInfo>,
        tracks: HashMap<String, Vec<CatalogueTrack>>,
    }

    impl InMemoryCatalogueProvider {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn with_playlist(mut self, reference: &str, info: PlaylistInfo, tracks: Vec<CatalogueTrack>) -> Self {
            self.playlists.insert(reference.to_string(), info);
            self.tracks.insert(reference.to_string(), tracks);
            self
        }
    }

    #[async_trait::async_trait]
    impl CatalogueProvider for InMemoryCatalogueProvider {
        async fn resolve_playlist(&self, reference: &str) -> Result<PlaylistInfo, CatalogueError> {
            self.playlists.get(reference).cloned().ok_or_else(|| CatalogueError::NotFound(reference.to_string()))
        }

        async fn list_playlist_tracks(&self, id: &str) -> Result<Vec<CatalogueTrack>, CatalogueError> {
            self.tracks.get(id).cloned().ok_or_else(|| CatalogueError::NotFound(id.to_string()))
        }
    }
}
