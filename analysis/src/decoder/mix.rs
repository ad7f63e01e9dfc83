//! `rodio`/`rubato`-based [`Decoder`] implementation.

use std::{f32::consts::SQRT_2, fs::File, io::BufReader, path::Path};

use rodio::Source;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::{errors::AnalysisError, errors::AnalysisResult, ResampledAudio, SAMPLE_RATE};

use super::Decoder;

/// Decodes any container `rodio`/`symphonia` understands, mixes down to
/// mono, and resamples to [`SAMPLE_RATE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MixDecoder;

impl Decoder for MixDecoder {
    fn decode(&self, path: &Path) -> AnalysisResult<ResampledAudio> {
        let file = BufReader::new(File::open(path)?);
        let source = rodio::Decoder::new(file)?.convert_samples::<f32>();

        // Channels are interleaved, e.g. stereo samples `[1, 2, 3, 4]` and
        // `[5, 6, 7, 8]` arrive as `[1, 5, 2, 6, 3, 7, 4, 8]`; collapse to mono
        // by averaging.
        let num_channels = source.channels() as usize;
        let sample_rate = source.sample_rate();
        if source.total_duration().is_none() {
            return Err(AnalysisError::IndeterminateDuration);
        }

        let mut mono_sample_array: Vec<f32> = match num_channels {
            0 => {
                return Err(AnalysisError::DecodeFailed(
                    rodio::decoder::DecoderError::NoStreams,
                ))
            }
            1 => source.collect(),
            2 => source
                .collect::<Vec<_>>()
                .chunks_exact(2)
                .map(|chunk| (chunk[0] + chunk[1]) * SQRT_2 / 2.)
                .collect(),
            _ => {
                log::warn!(
                    "audio source has {num_channels} channels, collapsing to mono by averaging"
                );
                source
                    .collect::<Vec<_>>()
                    .chunks_exact(num_channels)
                    .map(|chunk| chunk.iter().sum::<f32>() / num_channels as f32)
                    .collect()
            }
        };

        if mono_sample_array.is_empty() {
            return Err(AnalysisError::EmptyAudio);
        }

        let resampled_array = if sample_rate == SAMPLE_RATE {
            mono_sample_array.shrink_to_fit();
            mono_sample_array
        } else {
            let mut resampler = FastFixedIn::new(
                f64::from(SAMPLE_RATE) / f64::from(sample_rate),
                1.0,
                PolynomialDegree::Cubic,
                mono_sample_array.len(),
                1,
            )?;
            resampler.process(&[&mono_sample_array], None)?[0].clone()
        };

        Ok(ResampledAudio {
            path: path.to_owned(),
            samples: resampled_array,
        })
    }
}
