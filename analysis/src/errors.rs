use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to open file: {0}")]
    FileOpenError(#[from] std::io::Error),
    #[error("Failed to decode audio: {0}")]
    DecodeFailed(#[from] rodio::decoder::DecoderError),
    #[error("Failed to resample audio: {0}")]
    ResampleFailed(#[from] rubato::ResampleError),
    #[error("Failed to construct resampler: {0}")]
    ResamplerConstructionError(#[from] rubato::ResamplerConstructionError),
    #[error("Audio buffer is empty")]
    EmptyAudio,
    #[error("Audio source length is unknown or infinite")]
    IndeterminateDuration,
    #[error("Extractor failure: {0}")]
    ExtractorFailed(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
