//! The shared data model (`spec.md` §3): tracks, jobs, and the mix plans a
//! job produces.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub use mixcraft_analysis::{Analysis, Key, MixableSection, PitchClass, Sections, StyleKind, StyleVector};

/// Where a [`Track`]'s audio file currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
pub enum FileSource {
    Local,
    RemoteVideo,
    ObjectStore,
    Unavailable,
}

/// Catalogue metadata for a track, as returned by the catalogue provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub popularity: Option<u32>,
    pub preview_url: Option<String>,
}

/// A single track, identified by its external catalogue id. Independent of
/// any job; shared and deduplicated across jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: Uuid,
    pub catalogue_id: String,
    pub metadata: CatalogueMetadata,

    pub file_source: FileSource,
    /// Object-store key or local filesystem path; `None` iff
    /// `file_source == Unavailable`.
    pub file_pointer: Option<String>,
    pub file_size_bytes: Option<u64>,

    pub analysis: Analysis,
}

impl Track {
    /// A track with no usable file pointer can't be analysed or mixed.
    #[must_use]
    pub fn has_usable_file(&self) -> bool {
        self.file_source != FileSource::Unavailable && self.file_pointer.is_some()
    }

    /// A track carries a completed analysis once it has a BPM and an
    /// `analyzed_at` timestamp (`spec.md` §3's analysis invariant).
    #[must_use]
    pub fn is_analysed(&self) -> bool {
        self.analysis.analyzed_at.is_some() && self.analysis.bpm.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    pub total: u32,
    pub analysed: u32,
    pub downloaded: u32,
    pub failed: u32,
}

impl JobCounters {
    #[must_use]
    pub const fn new(total: u32) -> Self {
        Self {
            total,
            analysed: 0,
            downloaded: 0,
            failed: 0,
        }
    }

    /// `progress_percentage`: 100 if completed, 0 if failed, else
    /// `min(100*analysed/total, 99)` rounded to one decimal.
    #[must_use]
    pub fn progress_percentage(&self, status: JobStatus) -> f64 {
        match status {
            JobStatus::Completed => 100.0,
            JobStatus::Failed => 0.0,
            JobStatus::Pending | JobStatus::Processing => {
                if self.total == 0 {
                    0.0
                } else {
                    let raw = 100.0 * f64::from(self.analysed) / f64::from(self.total);
                    (raw.min(99.0) * 10.0).round() / 10.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub max_tracks: u32,
    pub skip_analysis_if_exists: bool,
    pub auto_fetch: bool,
    pub download_timeout_seconds: u64,
}

/// `playlist_name`/`playlist_owner`/`is_public`, embedded in a completed
/// job's result metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub playlist_name: String,
    pub playlist_owner: String,
    pub is_public: bool,
}

/// The result blob persisted on job completion: the emitted mix plan plus
/// the playlist it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub plan: MixPlan,
    pub playlist_info: PlaylistInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: Uuid,
    pub playlist_ref: String,
    pub catalogue_playlist_id: Option<String>,
    pub playlist_name: Option<String>,
    pub status: JobStatus,
    pub counters: JobCounters,
    pub options: JobOptions,
    pub error_message: Option<String>,
    pub result: Option<JobResult>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub started_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
}

impl AnalysisJob {
    #[must_use]
    pub fn progress_percentage(&self) -> f64 {
        self.counters.progress_percentage(self.status)
    }

    /// A job is "in flight" if resubmitting the same playlist reference
    /// should return it instead of starting a new one.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(self.status, JobStatus::Pending | JobStatus::Processing)
    }
}

/// Transition technique, selected by [`crate::model::MixTransition`]'s
/// compatibility scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum TechniqueKind {
    Crossfade,
    SmoothBlend,
    QuickCut,
    Beatmatch,
    Creative,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityScores {
    pub bpm: f64,
    pub key: f64,
    pub energy: f64,
    pub style: f64,
    pub vocal: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixTransition {
    pub position: u32,
    pub track_a: Uuid,
    pub track_b: Uuid,
    pub transition_start: f64,
    pub transition_duration: f64,
    pub technique: TechniqueKind,
    pub bpm_adjustment: f64,
    pub scores: CompatibilityScores,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum MixStrategy {
    BpmProgression,
    EnergyFlow,
    KeyHarmony,
    StyleClusters,
    SmartDj,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixPlan {
    pub total_duration: f64,
    pub total_tracks: u32,
    pub strategy: MixStrategy,
    pub metadata: serde_json::Value,
    pub transitions: Vec<MixTransition>,
}

/// A user's passive rating of a past transition. Not fed back into any
/// learning loop; a record only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionFeedback {
    pub job_id: Uuid,
    pub position: u32,
    pub rating: i8,
}
