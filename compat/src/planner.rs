//! Mix planning (`spec.md` §4.4): five pure ordering strategies plus the
//! shared machinery that turns an ordering into a [`MixPlan`].

use mixcraft_core::model::{MixPlan, MixStrategy, MixTransition, StyleKind, Track};
use serde_json::json;

use crate::score::{bpm_adjustment, score, select_technique};

const LAST_QUARTER_MIDPOINT: f64 = 0.875;

fn duration_seconds(t: &Track) -> f64 {
    t.metadata.duration_ms as f64 / 1000.0
}

/// Preferred hand-off point into a transition out of `t`: its mix-out point
/// when section analysis is available, else the midpoint of the last
/// quarter of the track.
fn mix_out_point(t: &Track) -> f64 {
    t.analysis
        .sections
        .as_ref()
        .map_or(LAST_QUARTER_MIDPOINT * duration_seconds(t), |s| s.mix_out_point)
}

/// `bpm_progression`: ascending BPM; tracks without a BPM sort to the end,
/// stable among themselves.
#[must_use]
pub fn bpm_progression(tracks: &[Track]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..tracks.len()).collect();
    order.sort_by(|&a, &b| {
        let ka = tracks[a].analysis.bpm.unwrap_or(f64::INFINITY);
        let kb = tracks[b].analysis.bpm.unwrap_or(f64::INFINITY);
        ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

/// `energy_flow`: sort by energy, split into the lower and higher half,
/// then interleave them low/high/low/high to form a wave.
#[must_use]
pub fn energy_flow(tracks: &[Track]) -> Vec<usize> {
    let mut by_energy: Vec<usize> = (0..tracks.len()).collect();
    by_energy.sort_by(|&a, &b| {
        let ea = tracks[a].analysis.energy.unwrap_or(0.5);
        let eb = tracks[b].analysis.energy.unwrap_or(0.5);
        ea.partial_cmp(&eb).unwrap_or(std::cmp::Ordering::Equal)
    });
    let mid = by_energy.len().div_ceil(2);
    let (lower, upper) = by_energy.split_at(mid);
    let mut order = Vec::with_capacity(tracks.len());
    for i in 0..lower.len().max(upper.len()) {
        if let Some(&l) = lower.get(i) {
            order.push(l);
        }
        if let Some(&u) = upper.get(i) {
            order.push(u);
        }
    }
    order
}

/// `key_harmony`: greedy chain maximising pairwise key score among keyed
/// tracks; keyless tracks are appended afterward in their original order.
#[must_use]
pub fn key_harmony(tracks: &[Track]) -> Vec<usize> {
    let (keyed, keyless): (Vec<usize>, Vec<usize>) =
        (0..tracks.len()).partition(|&i| tracks[i].analysis.key.is_some());

    let mut remaining = keyed;
    let mut order = Vec::with_capacity(tracks.len());
    if let Some(first) = remaining.first().copied() {
        order.push(first);
        remaining.retain(|&i| i != first);
    }
    while !remaining.is_empty() {
        let current = *order.last().unwrap();
        let (best_idx, _) = remaining
            .iter()
            .enumerate()
            .map(|(idx, &cand)| (idx, score(&tracks[current], &tracks[cand]).key))
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap();
        order.push(remaining.remove(best_idx));
    }
    order.extend(keyless);
    order
}

/// Macro grouping order for `style_clusters`. `vocal_centric` isn't named
/// in the source ordering; it's placed just before the unknown bucket since
/// it isn't one of the five named groups either.
fn style_bucket(kind: Option<StyleKind>) -> u8 {
    match kind {
        Some(StyleKind::AmbientTexture) => 0,
        Some(StyleKind::Acoustic) => 1,
        Some(StyleKind::MelodicFocus) => 2,
        Some(StyleKind::BeatDriven) => 3,
        Some(StyleKind::Electronic) => 4,
        Some(StyleKind::VocalCentric) => 5,
        None => 6,
    }
}

/// `style_clusters`: group by dominant style in the fixed macro order,
/// sorted by BPM within each group.
#[must_use]
pub fn style_clusters(tracks: &[Track]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..tracks.len()).collect();
    order.sort_by(|&a, &b| {
        let bucket_a = style_bucket(tracks[a].analysis.dominant_style);
        let bucket_b = style_bucket(tracks[b].analysis.dominant_style);
        bucket_a.cmp(&bucket_b).then_with(|| {
            let ba = tracks[a].analysis.bpm.unwrap_or(f64::INFINITY);
            let bb = tracks[b].analysis.bpm.unwrap_or(f64::INFINITY);
            ba.partial_cmp(&bb).unwrap_or(std::cmp::Ordering::Equal)
        })
    });
    order
}

/// `smart_dj`: greedy chain maximising overall compatibility.
#[must_use]
pub fn smart_dj(tracks: &[Track]) -> Vec<usize> {
    let mut remaining: Vec<usize> = (1..tracks.len()).collect();
    let mut order = Vec::with_capacity(tracks.len());
    if !tracks.is_empty() {
        order.push(0);
    }
    while !remaining.is_empty() {
        let current = *order.last().unwrap();
        let (best_idx, _) = remaining
            .iter()
            .enumerate()
            .map(|(idx, &cand)| (idx, score(&tracks[current], &tracks[cand]).overall))
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap();
        order.push(remaining.remove(best_idx));
    }
    order
}

#[must_use]
pub fn strategy_order(strategy: MixStrategy, tracks: &[Track]) -> Vec<usize> {
    match strategy {
        MixStrategy::BpmProgression => bpm_progression(tracks),
        MixStrategy::EnergyFlow => energy_flow(tracks),
        MixStrategy::KeyHarmony => key_harmony(tracks),
        MixStrategy::StyleClusters => style_clusters(tracks),
        MixStrategy::SmartDj => smart_dj(tracks),
    }
}

fn build_transition(position: u32, a: &Track, b: &Track) -> MixTransition {
    let subscores = score(a, b);
    let (technique, duration) = select_technique(&subscores);
    let max_start = (duration_seconds(a) - duration).max(0.0);
    let transition_start = mix_out_point(a).min(max_start);

    MixTransition {
        position,
        track_a: a.id,
        track_b: b.id,
        transition_start,
        transition_duration: duration,
        technique,
        bpm_adjustment: bpm_adjustment(a, b),
        scores: subscores,
        metadata: json!({
            "track_a_bpm": a.analysis.bpm,
            "track_a_energy": a.analysis.energy,
            "track_b_bpm": b.analysis.bpm,
            "track_b_energy": b.analysis.energy,
        }),
    }
}

/// Builds one [`MixTransition`] per adjacent pair in `order`.
#[must_use]
pub fn build_transitions(order: &[usize], tracks: &[Track]) -> Vec<MixTransition> {
    order
        .windows(2)
        .enumerate()
        .map(|(i, pair)| build_transition(u32::try_from(i).unwrap_or(u32::MAX), &tracks[pair[0]], &tracks[pair[1]]))
        .collect()
}

fn total_duration(order: &[usize], tracks: &[Track], transitions: &[MixTransition]) -> f64 {
    let Some(&last) = order.last() else { return 0.0 };
    let lead_in = transitions.first().map_or(0.0, |t| t.transition_start);
    let sum_durations: f64 = transitions.iter().map(|t| t.transition_duration).sum();
    let tail = duration_seconds(&tracks[last]) - mix_out_point(&tracks[last]);
    (lead_in + sum_durations + tail.max(0.0)).max(0.0)
}

/// Builds the full [`MixPlan`] for one strategy over `tracks`.
///
/// # Panics
///
/// Panics if `tracks` has fewer than two entries; callers must only invoke
/// this once the planner-infeasible check (§4.6) has passed.
#[must_use]
pub fn plan(tracks: &[Track], strategy: MixStrategy) -> MixPlan {
    assert!(tracks.len() >= 2, "mix planning requires at least two tracks");
    let order = strategy_order(strategy, tracks);
    let transitions = build_transitions(&order, tracks);
    let total_duration = total_duration(&order, tracks, &transitions);

    MixPlan {
        total_duration,
        total_tracks: u32::try_from(tracks.len()).unwrap_or(u32::MAX),
        strategy,
        metadata: json!({}),
        transitions,
    }
}

const STRATEGY_PRIOR: [(MixStrategy, f64); 5] = [
    (MixStrategy::SmartDj, 0.30),
    (MixStrategy::BpmProgression, 0.25),
    (MixStrategy::EnergyFlow, 0.20),
    (MixStrategy::KeyHarmony, 0.15),
    (MixStrategy::StyleClusters, 0.10),
];

fn prior_for(strategy: MixStrategy) -> f64 {
    STRATEGY_PRIOR
        .iter()
        .find(|&&(s, _)| s == strategy)
        .map_or(0.0, |&(_, p)| p)
}

fn option_score(plan: &MixPlan) -> f64 {
    let mean_overall = if plan.transitions.is_empty() {
        0.0
    } else {
        plan.transitions.iter().map(|t| t.scores.overall).sum::<f64>() / plan.transitions.len() as f64
    };
    0.4 * mean_overall + prior_for(plan.strategy) + 0.1 * (1.0 - plan.total_duration / 3600.0).max(0.0)
}

/// Builds all five strategies and returns the argmax by `spec.md`'s default
/// option formula, alongside every plan that was scored.
#[must_use]
pub fn default_plan(tracks: &[Track]) -> (MixPlan, Vec<MixPlan>) {
    let plans: Vec<MixPlan> = [
        MixStrategy::BpmProgression,
        MixStrategy::EnergyFlow,
        MixStrategy::KeyHarmony,
        MixStrategy::StyleClusters,
        MixStrategy::SmartDj,
    ]
    .into_iter()
    .map(|s| plan(tracks, s))
    .collect();

    let best_index = plans
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| option_score(a).partial_cmp(&option_score(b)).unwrap_or(std::cmp::Ordering::Equal))
        .map_or(0, |(i, _)| i);

    (plans[best_index].clone(), plans)
}
