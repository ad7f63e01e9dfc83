//! Per-track perceptual scalars (`spec.md` §4.2.3).
//!
//! Every formula here operates on already-computed frame arrays; none of
//! them can fail, so this module returns a plain struct rather than a
//! `Result`.

use ndarray::Array2;

use crate::primitives::{band_energy_ratio, spectral_contrast};
use crate::utils::variance;

/// Inputs shared by every perceptual formula, gathered once by
/// [`crate::Analysis::extract`] so each descriptor stays a pure function of
/// already-computed frame arrays.
pub struct Inputs<'a> {
    pub samples: &'a [f32],
    pub rms: &'a [f32],
    pub zcr: &'a [f32],
    pub onset: &'a [f32],
    pub centroid: &'a [f32],
    pub bandwidth: &'a [f32],
    pub magnitude_spectrogram: &'a Array2<f64>,
    pub sample_rate: u32,
    pub bpm: f64,
    pub beat_regularity: f64,
    pub autocorrelation_peak_ratio: f64,
    pub major_corr: f64,
    pub minor_corr: f64,
    pub vocal_energy_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perceptual {
    pub energy: f64,
    pub danceability: f64,
    pub valence: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub speechiness: f64,
    pub loudness: f64,
}

const SPEECH_BAND_HZ: (f64, f64) = (300.0, 3400.0);
const CONTRAST_BANDS: usize = 6;

fn mean_f32(values: &[f32]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        f64::from(values.iter().sum::<f32>()) / values.len() as f64
    }
}

fn var_f32(values: &[f32]) -> f64 {
    f64::from(variance(values))
}

#[must_use]
pub fn extract(inputs: Inputs<'_>) -> Perceptual {
    let mean_rms = mean_f32(inputs.rms);
    let mean_onset = mean_f32(inputs.onset);
    let mean_centroid = mean_f32(inputs.centroid);
    let mean_bandwidth = mean_f32(inputs.bandwidth);
    let mean_zcr = mean_f32(inputs.zcr);

    let energy = (mean_rms * 10.0).min(1.0);

    let danceability = 0.4 * inputs.beat_regularity
        + 0.4 * (2.0 * mean_onset).min(1.0)
        + 0.2 * inputs.autocorrelation_peak_ratio.min(1.0);

    let valence = 0.4 * (inputs.major_corr - inputs.minor_corr).max(0.0)
        + 0.3 * (mean_centroid / 4000.0).min(1.0)
        + 0.3 * (inputs.bpm / 140.0).min(1.0);

    let acousticness = 0.4 * (1.0 - mean_centroid / 4000.0)
        + 0.3 * (1.0 - mean_bandwidth / 2000.0)
        + 0.3 * (1.0 - 10.0 * mean_zcr);

    let instrumentalness = 1.0 - (3.0 * inputs.vocal_energy_ratio).min(1.0);

    let contrast = spectral_contrast(inputs.magnitude_spectrogram, inputs.sample_rate, CONTRAST_BANDS);
    let liveness =
        0.6 * (100.0 * f64::from(variance(inputs.rms))).min(1.0) + 0.4 * (10.0 * var_f32(&contrast)).min(1.0);

    let speech_band_ratio = mean_f32(&band_energy_ratio(
        inputs.magnitude_spectrogram,
        inputs.sample_rate,
        SPEECH_BAND_HZ.0,
        SPEECH_BAND_HZ.1,
    ));
    let speechiness = 0.5 * (2.0 * speech_band_ratio).min(1.0)
        + 0.3 * (20.0 * mean_zcr).min(1.0)
        + 0.2 * (5.0 * var_f32(inputs.onset)).min(1.0);

    let loudness = (20.0 * mean_rms.max(1e-10).log10()).max(-60.0);

    Perceptual {
        energy: energy.clamp(0.0, 1.0),
        danceability: danceability.clamp(0.0, 1.0),
        valence: valence.clamp(0.0, 1.0),
        acousticness: acousticness.clamp(0.0, 1.0),
        instrumentalness: instrumentalness.clamp(0.0, 1.0),
        liveness: liveness.clamp(0.0, 1.0),
        speechiness: speechiness.clamp(0.0, 1.0),
        loudness,
    }
}
