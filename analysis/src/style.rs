//! Five-axis style vector (`spec.md` §4.2.4).
//!
//! `melodic_focus` and the MFCC contribution to `vocal_centric` aren't given
//! closed-form weights in the source spec; the heuristics below are an
//! explicit, documented resolution of that gap (see `DESIGN.md`).

use ndarray::Axis;

use crate::primitives;
use crate::utils::variance;
use crate::StyleVector;

const CHROMA_N_FFT: usize = 4096;
const CHROMA_HOP: usize = 2048;
const N_MFCC: usize = 13;

pub struct Inputs<'a> {
    pub samples: &'a [f32],
    pub onset: &'a [f32],
    pub bandwidth: &'a [f32],
    pub beat_regularity: f64,
    pub vocal_energy_ratio: f64,
    pub acousticness: f64,
    pub sample_rate: u32,
}

/// Per-frame variance across the 12 chroma bins, averaged over time:
/// how much the pitch-class distribution concentrates on a few notes
/// (melody-driven) versus spreading evenly (drones, noise, percussion).
fn chroma_variance(samples: &[f32], sample_rate: u32) -> f64 {
    let chroma = primitives::chromagram(samples, sample_rate, CHROMA_N_FFT, CHROMA_HOP);
    if chroma.len_of(Axis(1)) == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut n = 0usize;
    for col in chroma.axis_iter(Axis(1)) {
        let mean = col.sum() / 12.0;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 12.0;
        total += var;
        n += 1;
    }
    if n == 0 {
        0.0
    } else {
        total / n as f64
    }
}

/// Coefficient of variation of frame-to-frame MFCC delta energy: vocal
/// passages carry more formant movement in the low MFCCs than sustained
/// instrumental textures, so a higher mean absolute delta leans
/// `vocal_centric`.
fn mfcc_delta_activity(samples: &[f32], sample_rate: u32) -> f64 {
    let mfcc = primitives::mfcc(samples, sample_rate, N_MFCC);
    let n_frames = mfcc.len_of(Axis(1));
    if n_frames < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut n = 0usize;
    for w in mfcc.axis_iter(Axis(1)).collect::<Vec<_>>().windows(2) {
        let delta: f64 = w[1].iter().zip(w[0].iter()).map(|(a, b)| (a - b).abs()).sum();
        total += delta / mfcc.len_of(Axis(0)) as f64;
        n += 1;
    }
    if n == 0 {
        0.0
    } else {
        total / n as f64
    }
}

#[must_use]
pub fn extract(inputs: Inputs<'_>) -> StyleVector {
    let beat_driven = inputs.beat_regularity.clamp(0.0, 1.0);

    let chroma_var = chroma_variance(inputs.samples, inputs.sample_rate);
    let centroid_var = variance(inputs.bandwidth);
    let melodic_focus = (5.0 * chroma_var + 0.0005 * f64::from(centroid_var)).clamp(0.0, 1.0);

    let onset_var = variance(inputs.onset);
    let ambient_texture = (1.0 - (3.0 * f64::from(onset_var)).min(1.0)).clamp(0.0, 1.0);

    let mfcc_activity = mfcc_delta_activity(inputs.samples, inputs.sample_rate);
    let vocal_centric =
        (0.7 * inputs.vocal_energy_ratio.min(1.0) + 0.3 * (4.0 * mfcc_activity).min(1.0)).clamp(0.0, 1.0);

    let acoustic_vs_electronic = inputs.acousticness.clamp(0.0, 1.0);

    StyleVector {
        beat_driven,
        melodic_focus,
        ambient_texture,
        vocal_centric,
        acoustic_vs_electronic,
    }
}
