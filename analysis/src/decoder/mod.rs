use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::mpsc::{self, SendError},
    thread,
};

use log::debug;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{errors::AnalysisResult, Analysis, ResampledAudio};

mod mix;
pub use mix::MixDecoder;

/// Trait used to implement a decoder for a given audio backend.
///
/// `decode` must resample the source to one channel at the crate's fixed
/// analysis sample rate ([`crate::SAMPLE_RATE`]) in f32le. Everything else on
/// this trait is built on top of that one contract.
pub trait Decoder {
    /// Decodes and resamples a file to mono f32 PCM at [`crate::SAMPLE_RATE`].
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be opened, the container/codec is
    /// unsupported or corrupt, or resampling fails.
    fn decode(&self, path: &Path) -> AnalysisResult<ResampledAudio>;

    /// Decodes `path` and runs the full feature-extraction pipeline over it.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails. Sub-extractor failures are
    /// tolerated inside [`Analysis::extract`] and do not surface here.
    #[inline]
    fn analyze_path<P: AsRef<Path>>(&self, path: P) -> AnalysisResult<Analysis> {
        Analysis::extract(&self.decode(path.as_ref())?)
    }

    /// Analyzes `paths` in parallel across all logical cores, emitting
    /// results through `callback`.
    ///
    /// Blocking; run from a dedicated thread. Drop the channel's receiver to
    /// cancel the remaining work.
    ///
    /// # Errors
    ///
    /// Errors if the `callback` channel is closed.
    #[inline]
    fn analyze_paths<P: Into<PathBuf>, I: Send + IntoIterator<Item = P>>(
        &self,
        paths: I,
        callback: mpsc::Sender<(PathBuf, AnalysisResult<Analysis>)>,
    ) -> Result<(), SendError<()>>
    where
        Self: Sync + Send,
    {
        let cores = thread::available_parallelism().unwrap_or(NonZeroUsize::new(1).unwrap());
        self.analyze_paths_with_cores(paths, cores, callback)
    }

    /// Analyzes `paths` in parallel across `number_cores` threads.
    ///
    /// See also [`Decoder::analyze_paths`].
    ///
    /// # Errors
    ///
    /// Errors if the `callback` channel is closed.
    fn analyze_paths_with_cores<P: Into<PathBuf>, I: IntoIterator<Item = P>>(
        &self,
        paths: I,
        number_cores: NonZeroUsize,
        callback: mpsc::Sender<(PathBuf, AnalysisResult<Analysis>)>,
    ) -> Result<(), SendError<()>>
    where
        Self: Sync + Send,
    {
        let mut cores = thread::available_parallelism().unwrap_or(NonZeroUsize::new(1).unwrap());
        if cores > number_cores {
            cores = number_cores;
        }
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();

        if paths.is_empty() {
            return Ok(());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cores.get())
            .build()
            .unwrap();

        pool.install(|| {
            paths.into_par_iter().try_for_each(|path| {
                debug!("analyzing '{}'", path.display());
                let analysis = self.analyze_path(&path);
                callback.send((path, analysis)).map_err(|_| SendError(()))
            })
        })
    }
}
