//! Vocal/instrumental interval detection (`spec.md` §4.2.6).
//!
//! Frames whose spectral centroid sits above a dynamic, per-track threshold
//! (the 70th percentile of the track's own centroid distribution) are taken
//! as vocal-bearing; contiguous runs are consolidated into intervals, and
//! the gaps between them become instrumental intervals covering the rest of
//! `[0, duration]`.

use crate::errors::AnalysisResult;
use crate::utils::percentile;
use crate::Interval;

/// Confidence assigned to a consolidated vocal run.
const VOCAL_CONFIDENCE: f64 = 0.6;
/// Confidence assigned to a gap-filled instrumental interval; lower than
/// `VOCAL_CONFIDENCE` since it's inferred by absence rather than detected.
const INSTRUMENTAL_CONFIDENCE: f64 = 0.5;
/// Percentile of the centroid distribution used as the vocal/instrumental
/// threshold.
const THRESHOLD_PERCENTILE: f64 = 0.70;
/// Runs shorter than this are treated as noise and dropped rather than
/// becoming their own interval.
const MIN_RUN_SECONDS: f64 = 0.5;

pub struct VocalResult {
    pub vocal_energy_ratio: f64,
    pub vocal_intervals: Vec<Interval>,
    pub instrumental_intervals: Vec<Interval>,
}

fn frame_to_seconds(frame: usize, hop: usize, sample_rate: u32) -> f64 {
    frame as f64 * f64::from(hop) / f64::from(sample_rate)
}

/// Detects vocal-bearing frames from the spectral centroid envelope and
/// folds the rest of the track's duration into instrumental intervals.
///
/// # Errors
///
/// Never fails for a non-empty `centroid`; an empty envelope still succeeds
/// with an all-instrumental `[0, duration]` split.
pub fn extract(
    centroid: &[f32],
    hop: usize,
    sample_rate: u32,
    duration: f64,
) -> AnalysisResult<VocalResult> {
    if centroid.is_empty() || duration <= 0.0 {
        return Ok(VocalResult {
            vocal_energy_ratio: 0.0,
            vocal_intervals: Vec::new(),
            instrumental_intervals: if duration > 0.0 {
                vec![Interval {
                    start: 0.0,
                    end: duration,
                    confidence: INSTRUMENTAL_CONFIDENCE,
                }]
            } else {
                Vec::new()
            },
        });
    }

    let threshold = percentile(centroid, THRESHOLD_PERCENTILE);

    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, &c) in centroid.iter().enumerate() {
        if c > threshold {
            run_start.get_or_insert(i);
        } else if let Some(start) = run_start.take() {
            runs.push((start, i));
        }
    }
    if let Some(start) = run_start {
        runs.push((start, centroid.len()));
    }

    let mut vocal_intervals: Vec<Interval> = runs
        .into_iter()
        .filter_map(|(start, end)| {
            let start_s = frame_to_seconds(start, hop, sample_rate);
            let end_s = frame_to_seconds(end, hop, sample_rate).min(duration);
            if end_s - start_s < MIN_RUN_SECONDS {
                return None;
            }
            Some(Interval {
                start: start_s,
                end: end_s,
                confidence: VOCAL_CONFIDENCE,
            })
        })
        .collect();
    vocal_intervals.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

    let mut instrumental_intervals = Vec::new();
    let mut cursor = 0.0;
    for v in &vocal_intervals {
        if v.start > cursor {
            instrumental_intervals.push(Interval {
                start: cursor,
                end: v.start,
                confidence: INSTRUMENTAL_CONFIDENCE,
            });
        }
        cursor = v.end.max(cursor);
    }
    if cursor < duration {
        instrumental_intervals.push(Interval {
            start: cursor,
            end: duration,
            confidence: INSTRUMENTAL_CONFIDENCE,
        });
    }

    let vocal_seconds: f64 = vocal_intervals.iter().map(|v| v.end - v.start).sum();
    let vocal_energy_ratio = (vocal_seconds / duration).clamp(0.0, 1.0);

    Ok(VocalResult {
        vocal_energy_ratio,
        vocal_intervals,
        instrumental_intervals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_centroid_yields_fully_instrumental_track() {
        let result = extract(&[], 512, 22_050, 10.0).unwrap();
        assert_eq!(result.instrumental_intervals.len(), 1);
        assert!(result.vocal_intervals.is_empty());
        assert!(result.vocal_energy_ratio.abs() < f64::EPSILON);
    }

    #[test]
    fn intervals_never_overlap_and_cover_the_duration() {
        let mut centroid = vec![500.0f32; 200];
        for v in centroid.iter_mut().skip(50).take(50) {
            *v = 4000.0;
        }
        let duration = (centroid.len() * 512) as f64 / 22_050.0;
        let result = extract(&centroid, 512, 22_050, duration).unwrap();

        let mut all: Vec<Interval> = result
            .vocal_intervals
            .iter()
            .chain(result.instrumental_intervals.iter())
            .copied()
            .collect();
        all.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap());
        for w in all.windows(2) {
            assert!(w[0].end <= w[1].start + 1e-6);
        }
        if let (Some(first), Some(last)) = (all.first(), all.last()) {
            assert!(first.start.abs() < 1e-6);
            assert!((last.end - duration).abs() < 1e-6);
        }
    }
}
