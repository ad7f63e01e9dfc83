//! Job-level error taxonomy.
//!
//! Each variant lines up with one of the pipeline stages; which ones are
//! fatal to a job and which are recorded-and-continued is a property of how
//! the orchestrator handles the variant, not of the type itself.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("could not determine the data directory")]
    Data,
    #[error("could not determine the config directory")]
    Config,
}

/// Failures an [`crate::model::AnalysisJob`] can end in, or record per-track
/// without ending.
#[derive(Error, Debug)]
pub enum JobError {
    /// Catalogue provider couldn't resolve the playlist or list its tracks.
    /// Fatal: ends the job.
    #[error("catalogue unavailable: {0}")]
    CatalogueUnavailable(String),

    /// Acquisition (cache/object-store/remote search) failed for a track.
    /// Non-fatal: the track is marked unavailable and the job continues.
    #[error("acquisition failed: {0}")]
    AcquisitionFailed(String),

    /// Loudness normalisation failed; the un-normalised file may still be
    /// used. Non-fatal, recorded as a warning.
    #[error("normalisation failed: {0}")]
    NormalisationFailed(String),

    /// Audio decoding failed or produced an empty buffer. Non-fatal: the
    /// track's analysis is skipped and the failure is recorded.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// A single feature sub-extractor failed. Non-fatal: its field stays
    /// `None` and the message is appended to `analysis_error`.
    #[error("extractor failed: {0}")]
    ExtractorFailed(String),

    /// Fewer than two analysed, usable tracks were available at planning
    /// time. Fatal: ends the job.
    #[error("not enough analysed tracks")]
    PlannerInfeasible,

    /// The job was cancelled by an external request. Fatal.
    #[error("cancelled by user")]
    Cancelled,

    /// Anything else. Fatal, message carried verbatim.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<mixcraft_analysis::errors::AnalysisError> for JobError {
    fn from(e: mixcraft_analysis::errors::AnalysisError) -> Self {
        use mixcraft_analysis::errors::AnalysisError as A;
        match e {
            A::EmptyAudio | A::DecodeFailed(_) | A::ResampleFailed(_) | A::ResamplerConstructionError(_) | A::FileOpenError(_) | A::IndeterminateDuration => {
                Self::DecodeFailed(e.to_string())
            }
            A::ExtractorFailed(msg) => Self::ExtractorFailed(msg),
        }
    }
}

pub type JobResult<T> = Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_map_to_decode_failed() {
        let err = JobError::from(mixcraft_analysis::errors::AnalysisError::EmptyAudio);
        assert!(matches!(err, JobError::DecodeFailed(_)));
    }

    #[test]
    fn extractor_failures_preserve_the_message() {
        let err = JobError::from(mixcraft_analysis::errors::AnalysisError::ExtractorFailed(
            "chroma extraction threw".into(),
        ));
        assert!(matches!(err, JobError::ExtractorFailed(msg) if msg == "chroma extraction threw"));
    }
}
