//! Tempo and beat-grid extraction (`spec.md` §4.2.1).

use crate::errors::{AnalysisError, AnalysisResult};
use crate::primitives::DEFAULT_HOP;
use crate::{BeatGrid, SAMPLE_RATE};

const MIN_BPM: f64 = 60.0;
const MAX_BPM: f64 = 200.0;
/// Autocorrelation search range, wide enough to fold into `[MIN_BPM, MAX_BPM]`
/// with at most one doubling/halving.
const SEARCH_MIN_BPM: f64 = 40.0;
const SEARCH_MAX_BPM: f64 = 240.0;

pub struct TempoResult {
    pub bpm: f64,
    pub beat_grid: BeatGrid,
    pub autocorrelation_peak_ratio: f64,
}

fn frame_to_seconds(frame: usize) -> f64 {
    frame as f64 * f64::from(DEFAULT_HOP) / f64::from(SAMPLE_RATE)
}

fn bpm_to_lag(bpm: f64) -> f64 {
    60.0 * f64::from(SAMPLE_RATE) / (f64::from(DEFAULT_HOP) * bpm)
}

/// Unbiased autocorrelation of the onset envelope.
fn autocorrelation(onset: &[f32], max_lag: usize) -> Vec<f64> {
    let n = onset.len();
    let max_lag = max_lag.min(n.saturating_sub(1));
    (0..=max_lag)
        .map(|lag| {
            onset[..n - lag]
                .iter()
                .zip(&onset[lag..])
                .map(|(a, b)| f64::from(*a) * f64::from(*b))
                .sum::<f64>()
        })
        .collect()
}

/// Folds a raw detected BPM into `[MIN_BPM, MAX_BPM]` by repeated
/// doubling/halving (`spec.md` S2: raw 45 -> 90, raw 210 -> 105).
#[must_use]
pub fn fold_bpm(mut bpm: f64) -> f64 {
    while bpm < MIN_BPM && bpm > 0.0 {
        bpm *= 2.0;
    }
    while bpm > MAX_BPM {
        bpm /= 2.0;
    }
    bpm
}

/// Runs a beat tracker over the onset-strength envelope: autocorrelation
/// picks the dominant period, then beats are placed at that period starting
/// from the strongest onset in the first period, each snapped to the nearest
/// local onset peak.
///
/// # Errors
///
/// Returns an error if the onset envelope is empty.
pub fn extract(onset: &[f32], duration: f64) -> AnalysisResult<TempoResult> {
    if onset.is_empty() {
        return Err(AnalysisError::ExtractorFailed("empty onset envelope".into()));
    }

    let max_lag = bpm_to_lag(SEARCH_MIN_BPM).ceil() as usize;
    let min_lag = bpm_to_lag(SEARCH_MAX_BPM).floor().max(1.0) as usize;
    let autocorr = autocorrelation(onset, max_lag);

    let peak_lag = autocorr
        .iter()
        .enumerate()
        .skip(min_lag.max(1))
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map_or(min_lag.max(1), |(lag, _)| lag);

    let peak_ratio = if autocorr[0] > f64::EPSILON {
        (autocorr[peak_lag] / autocorr[0]).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let raw_bpm = 60.0 * f64::from(SAMPLE_RATE) / (f64::from(DEFAULT_HOP) * peak_lag as f64);
    let bpm = fold_bpm(raw_bpm);

    let beat_period_frames = peak_lag.max(1);
    let search_window = (beat_period_frames / 5).max(1);

    let mut beat_frames = Vec::new();
    if !onset.is_empty() {
        let first_window_end = beat_period_frames.min(onset.len());
        if let Some((start, _)) = onset[..first_window_end]
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        {
            beat_frames.push(start);
            loop {
                let Some(&last) = beat_frames.last() else { break };
                let target = last + beat_period_frames;
                if target >= onset.len() {
                    break;
                }
                let lo = target.saturating_sub(search_window);
                let hi = (target + search_window).min(onset.len() - 1);
                let snapped = (lo..=hi)
                    .max_by(|&a, &b| onset[a].partial_cmp(&onset[b]).unwrap_or(std::cmp::Ordering::Equal))
                    .unwrap_or(target);
                beat_frames.push(snapped);
            }
        }
    }

    let beats: Vec<f64> = beat_frames
        .iter()
        .map(|&f| frame_to_seconds(f))
        .filter(|&t| t <= duration)
        .collect();

    let beat_grid = if beats.len() < 2 {
        BeatGrid::default()
    } else {
        let intervals: Vec<f64> = beats.windows(2).map(|w| w[1] - w[0]).collect();
        let confidences: Vec<f64> = beat_frames
            .iter()
            .take(beats.len())
            .map(|&f| f64::from(onset.get(f).copied().unwrap_or(0.0)))
            .collect();
        let mean_confidence = confidences.iter().sum::<f64>() / confidences.len() as f64;
        let mean_interval = intervals.iter().sum::<f64>() / intervals.len() as f64;
        let variance = intervals
            .iter()
            .map(|i| (i - mean_interval).powi(2))
            .sum::<f64>()
            / intervals.len() as f64;
        let cv = if mean_interval > f64::EPSILON {
            variance.sqrt() / mean_interval
        } else {
            1.0
        };
        let regularity = (1.0 - cv).clamp(0.0, 1.0);

        BeatGrid {
            beats,
            intervals,
            confidences,
            mean_confidence,
            regularity,
            mean_interval,
        }
    };

    Ok(TempoResult {
        bpm,
        beat_grid,
        autocorrelation_peak_ratio: peak_ratio,
    })
}
