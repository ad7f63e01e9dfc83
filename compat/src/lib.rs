//! Pairwise compatibility scoring (C3) and mix planning (C4).
//!
//! Grounded on the pairwise-distance/nearest-neighbour shape of the
//! upstream radio service, generalised from a single vector distance into
//! five weighted sub-scores and a deterministic technique selector.

pub mod planner;
pub mod score;

pub use planner::{build_transitions, default_plan, plan, strategy_order};
pub use score::{bpm_adjustment, score as compatibility_score, select_technique};

#[cfg(test)]
pub(crate) mod test_support {
    use mixcraft_core::model::{Analysis, CatalogueMetadata, FileSource, Track};
    use uuid::Uuid;

    pub fn blank_track(catalogue_id: &str) -> Track {
        Track {
            id: Uuid::new_v4(),
            catalogue_id: catalogue_id.to_string(),
            metadata: CatalogueMetadata {
                title: catalogue_id.to_string(),
                artist: "artist".to_string(),
                album: "album".to_string(),
                duration_ms: 180_000,
                popularity: None,
                preview_url: None,
            },
            file_source: FileSource::ObjectStore,
            file_pointer: Some(format!("audio/artist/{catalogue_id}.mp3")),
            file_size_bytes: Some(1_000_000),
            analysis: Analysis::default(),
        }
    }
}
