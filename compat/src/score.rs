//! Pairwise compatibility scoring (`spec.md` §4.3), generalised from the
//! single-vector nearest-neighbour distance pattern into five weighted
//! sub-scores plus a deterministic technique selector.

use mixcraft_core::model::{CompatibilityScores, PitchClass, StyleKind, TechniqueKind, Track};

const BPM_TOLERANCE: f64 = 0.06;
const DEFAULT_TRANSITION_DURATION: f64 = 16.0;

/// `(key, value)` pairs of dominant styles that cross-pollinate well, in
/// either order.
const ALLOWED_STYLE_PAIRS: [(StyleKind, StyleKind); 4] = [
    (StyleKind::BeatDriven, StyleKind::Electronic),
    (StyleKind::BeatDriven, StyleKind::MelodicFocus),
    (StyleKind::MelodicFocus, StyleKind::Acoustic),
    (StyleKind::AmbientTexture, StyleKind::MelodicFocus),
];

fn bpm_score(a: &Track, b: &Track) -> f64 {
    let (Some(bpm_a), Some(bpm_b)) = (a.analysis.bpm, b.analysis.bpm) else {
        return 0.0;
    };
    let diff = (bpm_a - bpm_b).abs() / bpm_a.max(bpm_b);
    1.0 - (diff / BPM_TOLERANCE).min(1.0)
}

/// For a minor key, the circle-of-fifths position used for distance is that
/// of its relative major (root transposed up three semitones): this is the
/// only way `C` vs `Am` lands on "same root, different mode" as required by
/// `spec.md`'s key-wheel scenario, since `Am`'s relative major is `C`.
fn relative_major_position(root: PitchClass, is_minor: bool) -> u8 {
    if is_minor {
        PitchClass::from_index((root as usize + 3) % 12).circle_of_fifths_position()
    } else {
        root.circle_of_fifths_position()
    }
}

fn key_score(a: &Track, b: &Track) -> f64 {
    let (Some(key_a), Some(key_b)) = (a.analysis.key, b.analysis.key) else {
        return 0.5;
    };

    if key_a.root == key_b.root {
        // Literal same root: identical key, or the parallel major/minor pair
        // (e.g. C vs Cm) the spec's "same root, different mode" wording and
        // the original implementation both score 0.8.
        return if key_a.is_minor == key_b.is_minor { 1.0 } else { 0.8 };
    }

    let pos_a = relative_major_position(key_a.root, key_a.is_minor);
    let pos_b = relative_major_position(key_b.root, key_b.is_minor);
    if pos_a == pos_b {
        // Relative major/minor pair (e.g. C vs Am): different literal root,
        // same circle-of-fifths position once the minor key is referred to
        // its relative major. This is the pairing the key-wheel scenario
        // means by "same root, different mode".
        return 0.8;
    }

    let raw = i32::from(pos_a) - i32::from(pos_b);
    let d = raw.rem_euclid(12).min((-raw).rem_euclid(12));
    match d {
        1 => 0.7,
        7 => 0.6,
        2 => 0.4,
        _ => 0.2,
    }
}

fn energy_score(a: &Track, b: &Track) -> f64 {
    let sectioned = a
        .analysis
        .sections
        .as_ref()
        .zip(b.analysis.sections.as_ref())
        .map(|(sa, sb)| 1.0 - (sa.outro_energy - sb.intro_energy).abs());
    if let Some(score) = sectioned {
        return score.clamp(0.0, 1.0);
    }
    match (a.analysis.energy, b.analysis.energy) {
        (Some(ea), Some(eb)) => (1.0 - (ea - eb).abs()).clamp(0.0, 1.0),
        _ => 0.5,
    }
}

fn style_score(a: &Track, b: &Track) -> f64 {
    let (Some(style_a), Some(style_b)) = (a.analysis.dominant_style, b.analysis.dominant_style) else {
        return 0.5;
    };
    if style_a == style_b {
        return 1.0;
    }
    let paired = ALLOWED_STYLE_PAIRS
        .iter()
        .any(|&(x, y)| (x == style_a && y == style_b) || (x == style_b && y == style_a));
    if paired {
        0.7
    } else {
        0.3
    }
}

fn vocal_score(a: &Track, b: &Track) -> f64 {
    let (Some(style_a), Some(style_b)) = (a.analysis.style, b.analysis.style) else {
        return 0.3;
    };
    if style_a.vocal_centric > 0.7 && style_b.vocal_centric > 0.7 {
        return 0.3;
    }
    (1.0 - (style_a.vocal_centric - style_b.vocal_centric).abs()).max(0.3)
}

/// Computes the five sub-scores and the weighted overall for the ordered
/// pair `(a, b)`.
#[must_use]
pub fn score(a: &Track, b: &Track) -> CompatibilityScores {
    let bpm = bpm_score(a, b);
    let key = key_score(a, b);
    let energy = energy_score(a, b);
    let style = style_score(a, b);
    let vocal = vocal_score(a, b);
    let overall = 0.25 * bpm + 0.20 * key + 0.30 * energy + 0.15 * style + 0.10 * vocal;
    CompatibilityScores { bpm, key, energy, style, vocal, overall }
}

/// `bpm_adjustment` = `100*(bpmB - bpmA)/bpmA`, 0 when either BPM is
/// unknown.
#[must_use]
pub fn bpm_adjustment(a: &Track, b: &Track) -> f64 {
    match (a.analysis.bpm, b.analysis.bpm) {
        (Some(bpm_a), Some(bpm_b)) if bpm_a.abs() > f64::EPSILON => 100.0 * (bpm_b - bpm_a) / bpm_a,
        _ => 0.0,
    }
}

/// Deterministic, first-match technique and transition duration for a set
/// of scores (testable property 7: a pure function of the scores).
///
/// `energy < 0.3` is checked before the `bpm >= 0.8` beatmatch rule: the
/// source's own worked example (BPM=0.9, Energy=0.1 -> quick_cut) only
/// holds with energy checked first, even though the bullet list enumerates
/// beatmatch before quick_cut.
#[must_use]
pub fn select_technique(scores: &CompatibilityScores) -> (TechniqueKind, f64) {
    let (technique, mut duration) = if scores.overall >= 0.8 && scores.bpm >= 0.7 {
        (TechniqueKind::SmoothBlend, DEFAULT_TRANSITION_DURATION * 1.5)
    } else if scores.energy < 0.3 {
        (TechniqueKind::QuickCut, 2.0)
    } else if scores.bpm >= 0.8 {
        (TechniqueKind::Beatmatch, DEFAULT_TRANSITION_DURATION)
    } else if scores.overall < 0.4 {
        (TechniqueKind::Creative, DEFAULT_TRANSITION_DURATION)
    } else {
        (TechniqueKind::Crossfade, DEFAULT_TRANSITION_DURATION)
    };

    if scores.overall < 0.3 {
        duration = 4.0;
    }

    (technique, duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixcraft_core::model::Key;
    use pretty_assertions::assert_eq;

    fn track_with_key(root: PitchClass, is_minor: bool) -> Track {
        let mut t = crate::test_support::blank_track("t");
        t.analysis.key = Some(Key { root, is_minor });
        t
    }

    #[test]
    fn key_wheel_c_to_g_is_distance_one() {
        let a = track_with_key(PitchClass::C, false);
        let b = track_with_key(PitchClass::G, false);
        assert!((key_score(&a, &b) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn key_wheel_c_to_a_minor_is_same_relative_root() {
        let a = track_with_key(PitchClass::C, false);
        let b = track_with_key(PitchClass::A, true);
        assert!((key_score(&a, &b) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn key_wheel_c_to_c_minor_is_parallel_mode() {
        let a = track_with_key(PitchClass::C, false);
        let b = track_with_key(PitchClass::C, true);
        assert!((key_score(&a, &b) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn key_wheel_c_to_f_sharp_is_distance_six() {
        let a = track_with_key(PitchClass::C, false);
        let b = track_with_key(PitchClass::FSharp, false);
        assert!((key_score(&a, &b) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn key_score_is_symmetric() {
        let a = track_with_key(PitchClass::D, true);
        let b = track_with_key(PitchClass::GSharp, false);
        assert!((key_score(&a, &b) - key_score(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn bpm_score_is_symmetric() {
        let mut a = crate::test_support::blank_track("a");
        let mut b = crate::test_support::blank_track("b");
        a.analysis.bpm = Some(120.0);
        b.analysis.bpm = Some(128.0);
        assert!((bpm_score(&a, &b) - bpm_score(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn technique_selection_matches_s4() {
        let scores = CompatibilityScores { bpm: 0.9, key: 0.9, energy: 0.7, style: 1.0, vocal: 1.0, overall: 0.0 };
        let overall = 0.25 * scores.bpm + 0.20 * scores.key + 0.30 * scores.energy + 0.15 * scores.style + 0.10 * scores.vocal;
        let scores = CompatibilityScores { overall, ..scores };
        assert!((overall - 0.86).abs() < 0.01);
        let (technique, duration) = select_technique(&scores);
        assert_eq!(technique, TechniqueKind::SmoothBlend);
        assert!((duration - 24.0).abs() < 1e-9);
    }

    #[test]
    fn low_energy_forces_quick_cut() {
        let scores = CompatibilityScores { bpm: 0.9, key: 0.5, energy: 0.1, style: 0.5, vocal: 0.5, overall: 0.5 };
        let (technique, duration) = select_technique(&scores);
        assert_eq!(technique, TechniqueKind::QuickCut);
        assert!((duration - 2.0).abs() < 1e-9);
    }

    #[test]
    fn every_subscore_and_overall_is_in_unit_interval() {
        let mut a = crate::test_support::blank_track("a");
        let mut b = crate::test_support::blank_track("b");
        a.analysis.bpm = Some(90.0);
        b.analysis.bpm = Some(180.0);
        let scores = score(&a, &b);
        for v in [scores.bpm, scores.key, scores.energy, scores.style, scores.vocal, scores.overall] {
            assert!((0.0..=1.0).contains(&v), "{v} out of range");
        }
    }
}
