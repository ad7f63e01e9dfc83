use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("no remote match found for {0:?}")]
    NoMatchFound(String),
    #[error("download timed out")]
    Timeout,
    #[error("normalisation failed: {0}")]
    NormalisationFailed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type AcquisitionResult<T> = Result<T, AcquisitionError>;
