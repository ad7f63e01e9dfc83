//! Structural/section analysis (`spec.md` §4.2.5): intro/outro boundaries,
//! a coarse energy profile, mix-in/out points, and auxiliary mixable
//! sections.

use crate::errors::{AnalysisError, AnalysisResult};
use crate::utils::percentile;
use crate::{BeatGrid, MixableSection, MixableSectionKind, Sections};

/// Length, in seconds, of the sliding window used for variance/stability and
/// mix-point scoring.
const WINDOW_SECONDS: f64 = 2.0;
/// Step, in seconds, between successive windows (overlapping: a quarter of
/// the window length).
const STEP_SECONDS: f64 = WINDOW_SECONDS / 4.0;
/// Cadence, in seconds, of the coarse `energy_profile` series.
const ENERGY_PROFILE_STEP_SECONDS: f64 = 10.0;
const MAX_MIXABLE_SECTIONS: usize = 3;

struct Window {
    start: f64,
    end: f64,
    mean_rms: f32,
    variance: f32,
}

impl Window {
    fn stability(&self) -> f64 {
        if self.mean_rms <= f32::EPSILON {
            return 0.0;
        }
        (1.0 - f64::from(self.variance.sqrt() / self.mean_rms)).clamp(0.0, 1.0)
    }
}

fn frame_to_seconds(frame: usize, hop: usize, sample_rate: u32) -> f64 {
    frame as f64 * f64::from(hop) / f64::from(sample_rate)
}

/// Overlapping sliding windows over the frame-level RMS envelope, each
/// `WINDOW_SECONDS` long, `STEP_SECONDS` apart.
fn sliding_windows(rms: &[f32], hop: usize, sample_rate: u32) -> Vec<Window> {
    let frames_per_window =
        ((WINDOW_SECONDS * f64::from(sample_rate)) / f64::from(hop)).round().max(1.0) as usize;
    let frames_per_step =
        ((STEP_SECONDS * f64::from(sample_rate)) / f64::from(hop)).round().max(1.0) as usize;

    if rms.len() < frames_per_window {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut i = 0;
    while i + frames_per_window <= rms.len() {
        let chunk = &rms[i..i + frames_per_window];
        let mean = chunk.iter().sum::<f32>() / chunk.len() as f32;
        let variance = chunk.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / chunk.len() as f32;
        windows.push(Window {
            start: frame_to_seconds(i, hop, sample_rate),
            end: frame_to_seconds(i + frames_per_window, hop, sample_rate),
            mean_rms: mean,
            variance,
        });
        i += frames_per_step;
    }
    windows
}

fn nearest_beat_at_or_before(beat_grid: Option<&BeatGrid>, limit: f64) -> Option<f64> {
    beat_grid.and_then(|g| g.beats.iter().copied().filter(|&b| b <= limit).fold(None, |best, b| {
        Some(best.map_or(b, |a| a.max(b)))
    }))
}

fn nearest_beat_in_range(beat_grid: Option<&BeatGrid>, lo: f64, hi: f64) -> Option<f64> {
    beat_grid.and_then(|g| {
        g.beats
            .iter()
            .copied()
            .filter(|&b| b >= lo && b <= hi)
            .min_by(|a, b| (hi - a).abs().partial_cmp(&(hi - b).abs()).unwrap_or(std::cmp::Ordering::Equal))
    })
}

/// Earliest time, after the track's initial rise, where windowed RMS
/// variance falls to or below the 25th percentile of the variances observed
/// within the first `min(60s, 30% duration)`.
fn find_intro_end(windows: &[Window], duration: f64) -> f64 {
    let region_end = duration.min(60.0).min(0.3 * duration).max(0.0);
    let region: Vec<&Window> = windows.iter().filter(|w| w.start < region_end).collect();
    if region.is_empty() {
        return 0.0;
    }

    let variances: Vec<f32> = region.iter().map(|w| w.variance).collect();
    let threshold = percentile(&variances, 0.25);

    // The initial rise: the window with the steepest RMS increase over its
    // predecessor.
    let rise_idx = region
        .windows(2)
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            (a[1].mean_rms - a[0].mean_rms)
                .partial_cmp(&(b[1].mean_rms - b[0].mean_rms))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map_or(0, |(i, _)| i + 1);

    region[rise_idx..]
        .iter()
        .find(|w| w.variance <= threshold)
        .map_or_else(|| region.last().map_or(0.0, |w| w.start), |w| w.start)
}

/// Latest time, searching backwards from `duration`, where a window's mean
/// RMS drops by at least 20% versus its immediate predecessor.
fn find_outro_start(windows: &[Window], duration: f64) -> f64 {
    if windows.len() < 2 {
        return duration;
    }
    for pair in windows.windows(2).rev() {
        let (before, after) = (pair[0].mean_rms, pair[1].mean_rms);
        if before > f32::EPSILON && (before - after) / before >= 0.2 {
            return pair[1].start;
        }
    }
    duration
}

fn mean_rms_over(rms: &[f32], hop: usize, sample_rate: u32, start: f64, end: f64) -> f64 {
    if rms.is_empty() || end <= start {
        return 0.0;
    }
    let frame_len = f64::from(hop) / f64::from(sample_rate);
    let lo = (start / frame_len).floor().max(0.0) as usize;
    let hi = ((end / frame_len).ceil() as usize).min(rms.len());
    if lo >= hi {
        return 0.0;
    }
    f64::from(rms[lo..hi].iter().sum::<f32>()) / (hi - lo) as f64
}

fn find_mix_in_point(
    windows: &[Window],
    duration: f64,
    intro_end: f64,
    beat_grid: Option<&BeatGrid>,
) -> f64 {
    let cap = duration.min(45.0).min(0.3 * duration).max(0.0);
    let peak = windows.iter().map(|w| w.mean_rms).fold(0.0f32, f32::max).max(1e-10);

    let candidate = windows
        .iter()
        .filter(|w| w.start < cap)
        .max_by(|a, b| {
            let score = |w: &&Window| 0.6 * w.stability() + 0.4 * f64::from(w.mean_rms / peak);
            score(a).partial_cmp(&score(b)).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map_or(0.0, |w| w.start);

    let snapped = nearest_beat_at_or_before(beat_grid, intro_end).unwrap_or(candidate);
    snapped.max(8.0).min(duration)
}

fn find_mix_out_point(
    windows: &[Window],
    duration: f64,
    outro_start: f64,
    beat_grid: Option<&BeatGrid>,
) -> f64 {
    let lo = (duration - 45.0).max(0.0);

    let candidate = windows
        .iter()
        .zip(windows.iter().skip(1))
        .filter(|(_, after)| after.start >= lo)
        .max_by(|(before_a, after_a), (before_b, after_b)| {
            let drop = |before: &&Window, after: &&Window| {
                if before.mean_rms > f32::EPSILON {
                    f64::from((before.mean_rms - after.mean_rms) / before.mean_rms).max(0.0)
                } else {
                    0.0
                }
            };
            let score_a = 0.7 * drop(before_a, after_a) + 0.3 * after_a.stability();
            let score_b = 0.7 * drop(before_b, after_b) + 0.3 * after_b.stability();
            score_a.partial_cmp(&score_b).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map_or(duration, |(_, after)| after.start);

    let ceiling = (duration - 4.0).max(0.0);
    let floor = 0.7 * duration;
    let snapped = nearest_beat_in_range(beat_grid, outro_start, ceiling).unwrap_or(candidate);
    snapped.clamp(floor.min(ceiling), ceiling)
}

fn find_mixable_sections(
    windows: &[Window],
    duration: f64,
    beat_grid: Option<&BeatGrid>,
) -> Vec<MixableSection> {
    let peak = windows.iter().map(|w| w.mean_rms).fold(0.0f32, f32::max).max(1e-10);
    let lo = 20.0;
    let hi = (duration - 20.0).max(lo);

    let mut candidates: Vec<MixableSection> = windows
        .iter()
        .filter(|w| w.start >= lo && w.end <= hi)
        .filter_map(|w| {
            let normalized_energy = f64::from(w.mean_rms / peak).min(1.0);
            let stability = w.stability();
            if normalized_energy < 0.3 && stability > 0.7 {
                let kind = if normalized_energy < 0.15 {
                    MixableSectionKind::Breakdown
                } else {
                    MixableSectionKind::Ambient
                };
                let beat_count = beat_grid.map_or(0, |g| {
                    u32::try_from(g.beats.iter().filter(|&&b| b >= w.start && b < w.end).count())
                        .unwrap_or(u32::MAX)
                });
                Some(MixableSection {
                    kind,
                    start: w.start,
                    end: w.end,
                    energy: normalized_energy,
                    stability,
                    beat_count,
                })
            } else {
                None
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        let score = |s: &MixableSection| s.stability * (1.0 - s.energy);
        score(b).partial_cmp(&score(a)).unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(MAX_MIXABLE_SECTIONS);
    candidates
}

/// Runs the section/mix-point analysis over the frame-level RMS envelope.
///
/// # Errors
///
/// Returns an error if `rms` is empty (the caller should never hit this: the
/// decoded buffer is already known non-empty by the time this runs).
pub fn extract(
    rms: &[f32],
    _window: usize,
    hop: usize,
    sample_rate: u32,
    duration: f64,
    beat_grid: Option<&BeatGrid>,
) -> AnalysisResult<Sections> {
    if rms.is_empty() {
        return Err(AnalysisError::ExtractorFailed("empty RMS envelope".into()));
    }

    let windows = sliding_windows(rms, hop, sample_rate);

    let intro_end = find_intro_end(&windows, duration);
    let outro_start = find_outro_start(&windows, duration);
    let intro_energy = mean_rms_over(rms, hop, sample_rate, 0.0, intro_end);
    let outro_energy = mean_rms_over(rms, hop, sample_rate, outro_start, duration);

    let mut energy_profile = Vec::new();
    let mut t = 0.0;
    while t < duration {
        let end = (t + ENERGY_PROFILE_STEP_SECONDS).min(duration);
        energy_profile.push((t, mean_rms_over(rms, hop, sample_rate, t, end)));
        t += ENERGY_PROFILE_STEP_SECONDS;
    }

    let mix_in_point = find_mix_in_point(&windows, duration, intro_end, beat_grid);
    let mix_out_point = find_mix_out_point(&windows, duration, outro_start, beat_grid);
    let mixable_sections = find_mixable_sections(&windows, duration, beat_grid);

    Ok(Sections {
        intro_end,
        outro_start,
        intro_energy,
        outro_energy,
        energy_profile,
        mix_in_point,
        mix_out_point,
        mixable_sections,
    })
}
