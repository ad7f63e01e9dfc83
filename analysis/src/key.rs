//! Key and mode detection (`spec.md` §4.2.2).

use ndarray::Axis;

use crate::errors::AnalysisResult;
use crate::primitives::chromagram;
use crate::{Key, PitchClass};

const CHROMA_N_FFT: usize = 4096;
const CHROMA_HOP: usize = 2048;

/// Diatonic major-scale degrees, semitone offsets from the root.
const MAJOR_DEGREES: [usize; 7] = [0, 2, 4, 5, 7, 9, 11];
/// Natural-minor-scale degrees, semitone offsets from the root.
const MINOR_DEGREES: [usize; 7] = [0, 2, 3, 5, 7, 8, 10];

pub struct KeyResult {
    pub key: Option<Key>,
    pub confidence: f64,
    pub major_corr: f64,
    pub minor_corr: f64,
}

fn template(degrees: &[usize], root: usize) -> [f64; 12] {
    let mut t = [0.0; 12];
    for &d in degrees {
        t[(root + d) % 12] = 1.0;
    }
    t
}

fn correlate(chroma: &[f64; 12], template: &[f64; 12]) -> f64 {
    chroma.iter().zip(template.iter()).map(|(c, t)| c * t).sum()
}

/// Averages a chromagram across time, finds the dominant pitch class, then
/// correlates against major/minor templates rotated to that root.
///
/// # Errors
///
/// Never fails for a non-empty signal; returns `key: None` (with zero
/// confidence) when the signal carries no discernible pitch content.
pub fn extract(samples: &[f32], sample_rate: u32) -> AnalysisResult<KeyResult> {
    let chroma = chromagram(samples, sample_rate, CHROMA_N_FFT, CHROMA_HOP);

    let n_frames = chroma.len_of(Axis(1)).max(1);
    let mut avg = [0.0f64; 12];
    for row in 0..12.min(chroma.len_of(Axis(0))) {
        avg[row] = chroma.row(row).sum() / n_frames as f64;
    }

    let total: f64 = avg.iter().sum();
    if total <= f64::EPSILON {
        return Ok(KeyResult {
            key: None,
            confidence: 0.0,
            major_corr: 0.0,
            minor_corr: 0.0,
        });
    }

    let dominant = avg
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map_or(0, |(i, _)| i);

    let major_corr = correlate(&avg, &template(&MAJOR_DEGREES, dominant));
    let minor_corr = correlate(&avg, &template(&MINOR_DEGREES, dominant));
    let is_minor = minor_corr > major_corr;

    let max_chroma = avg.iter().cloned().fold(0.0, f64::max);
    let confidence = (max_chroma / total).clamp(0.0, 1.0);

    Ok(KeyResult {
        key: Some(Key {
            root: PitchClass::from_index(dominant),
            is_minor,
        }),
        confidence,
        major_corr,
        minor_corr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let total = (sample_rate as f32 * seconds) as usize;
        (0..total)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn silence_yields_no_key() {
        let silence = vec![0.0f32; 44_100];
        let result = extract(&silence, 22_050).unwrap();
        assert!(result.key.is_none());
        assert!(result.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_is_bounded() {
        let tone = sine(440.0, 22_050, 2.0);
        let result = extract(&tone, 22_050).unwrap();
        assert!((0.0..=1.0).contains(&result.confidence));
    }
}
