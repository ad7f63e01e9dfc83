//! Signal primitives and musical feature extraction.
//!
//! Decoding goes through [`decoder::Decoder`] (`rodio`/`symphonia` + `rubato`,
//! resampling everything to a fixed mono [`SAMPLE_RATE`]). Everything above
//! that is pure, deterministic functions over the decoded buffer: short-time
//! Fourier transform, chromagram, MFCC, onset envelope, and the perceptual
//! descriptors, beat grid, key, style vector, and structural/vocal analysis
//! built on top of them.

pub mod decoder;
pub mod errors;
pub mod key;
pub mod perceptual;
pub mod primitives;
pub mod structure;
pub mod style;
pub mod tempo;
pub mod utils;
pub mod vocal;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use errors::{AnalysisError, AnalysisResult};

/// The resampled audio data used for analysis.
///
/// Must be mono (1 channel), at [`SAMPLE_RATE`].
#[derive(Debug, Clone)]
pub struct ResampledAudio {
    pub path: PathBuf,
    pub samples: Vec<f32>,
}

/// The sampling rate every decoded buffer is resampled to before analysis.
pub const SAMPLE_RATE: u32 = 22_050;

/// The type of individual scalar features.
pub type Feature = f32;

/// Schema version of the [`Analysis`] record, bumped whenever the field set
/// or a formula changes in a way that invalidates previously stored values.
pub const ANALYSIS_VERSION: u32 = 1;

/// Pitch class of a musical key, `C` through `B` in semitone order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        Self::C,
        Self::CSharp,
        Self::D,
        Self::DSharp,
        Self::E,
        Self::F,
        Self::FSharp,
        Self::G,
        Self::GSharp,
        Self::A,
        Self::ASharp,
        Self::B,
    ];

    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Position on the circle of fifths, `C = 0, G = 1, D = 2, ...`.
    #[must_use]
    pub const fn circle_of_fifths_position(self) -> u8 {
        // circle of fifths order: C G D A E B F# C# G# D# A# F
        match self {
            Self::C => 0,
            Self::G => 1,
            Self::D => 2,
            Self::A => 3,
            Self::E => 4,
            Self::B => 5,
            Self::FSharp => 6,
            Self::CSharp => 7,
            Self::GSharp => 8,
            Self::DSharp => 9,
            Self::ASharp => 10,
            Self::F => 11,
        }
    }
}

/// A detected musical key: root pitch class plus major/minor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub root: PitchClass,
    pub is_minor: bool,
}

/// A half-open time interval with a detection confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
    pub confidence: f64,
}

/// Ordered beat timestamps plus derived intervals and confidences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    pub beats: Vec<f64>,
    pub intervals: Vec<f64>,
    pub confidences: Vec<f64>,
    pub mean_confidence: f64,
    pub regularity: f64,
    pub mean_interval: f64,
}

/// The five-axis style mixture, each weight in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleVector {
    pub beat_driven: f64,
    pub melodic_focus: f64,
    pub ambient_texture: f64,
    pub vocal_centric: f64,
    pub acoustic_vs_electronic: f64,
}

/// Coarse style bucket used for `dominant_style` and the `style_clusters`
/// mix-planner ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum StyleKind {
    BeatDriven,
    MelodicFocus,
    AmbientTexture,
    VocalCentric,
    Acoustic,
    Electronic,
}

impl StyleVector {
    /// `dominant_style` (argmax) and `style_confidence` (top minus second).
    ///
    /// `acoustic_vs_electronic` is split into `Acoustic`/`Electronic` by
    /// whether its raw value is at or above `0.5` before the argmax runs,
    /// since the underlying scalar already leans acoustic above that
    /// midpoint (it reuses the acousticness formula directly).
    #[must_use]
    pub fn dominant(&self) -> (StyleKind, f64) {
        let acoustic_electronic_kind = if self.acoustic_vs_electronic >= 0.5 {
            StyleKind::Acoustic
        } else {
            StyleKind::Electronic
        };
        let mut scored = [
            (StyleKind::BeatDriven, self.beat_driven),
            (StyleKind::MelodicFocus, self.melodic_focus),
            (StyleKind::AmbientTexture, self.ambient_texture),
            (StyleKind::VocalCentric, self.vocal_centric),
            (acoustic_electronic_kind, self.acoustic_vs_electronic.max(1.0 - self.acoustic_vs_electronic)),
        ];
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let confidence = (scored[0].1 - scored[1].1).max(0.0);
        (scored[0].0, confidence)
    }
}

/// One of up to three auxiliary sections suitable for mixing into or out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum MixableSectionKind {
    Breakdown,
    Ambient,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixableSection {
    pub kind: MixableSectionKind,
    pub start: f64,
    pub end: f64,
    pub energy: f64,
    pub stability: f64,
    pub beat_count: u32,
}

/// Structural/section analysis: intro/outro boundaries, energy profile, and
/// mix-in/out points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sections {
    pub intro_end: f64,
    pub outro_start: f64,
    pub intro_energy: f64,
    pub outro_energy: f64,
    pub energy_profile: Vec<(f64, f64)>,
    pub mix_in_point: f64,
    pub mix_out_point: f64,
    pub mixable_sections: Vec<MixableSection>,
}

/// The flat per-track analysis record (`spec.md` §3's "Analysis block").
///
/// Every field but `analysis_version`/`analyzed_at`/`analysis_error` is
/// independently optional: a failed sub-extractor leaves its field `None`
/// and appends a message to `analysis_error` rather than failing the whole
/// analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub bpm: Option<f64>,
    pub key: Option<Key>,
    pub key_confidence: f64,

    pub energy: Option<f64>,
    pub danceability: Option<f64>,
    pub valence: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub speechiness: Option<f64>,
    pub loudness: Option<f64>,

    pub beat_grid: Option<BeatGrid>,
    pub style: Option<StyleVector>,
    pub dominant_style: Option<StyleKind>,
    pub style_confidence: f64,
    pub sections: Option<Sections>,
    pub vocal_intervals: Vec<Interval>,
    pub instrumental_intervals: Vec<Interval>,

    pub analysis_version: u32,
    pub analyzed_at: Option<OffsetDateTime>,
    pub analysis_error: Vec<String>,
}

impl Analysis {
    /// Runs the full C1+C2 pipeline over `audio`, merging successes and
    /// recording sub-extractor failures into `analysis_error` instead of
    /// aborting.
    ///
    /// This is meant to be run within a rayon thread pool; it fans
    /// independent sub-extractors out with [`rayon::join`].
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptyAudio`] only if the decoded buffer
    /// itself is empty; individual descriptor failures never propagate here.
    #[allow(clippy::too_many_lines)]
    pub fn extract(audio: &ResampledAudio) -> AnalysisResult<Self> {
        if audio.samples.is_empty() {
            return Err(AnalysisError::EmptyAudio);
        }

        let samples = &audio.samples;
        let duration = samples.len() as f64 / f64::from(SAMPLE_RATE);
        let mut analysis_error = Vec::new();

        let mag_spec = primitives::magnitude_spectrogram(samples);
        let rms = primitives::frame_rms(samples, primitives::DEFAULT_WINDOW, primitives::DEFAULT_HOP);
        let zcr =
            primitives::zero_crossing_rate(samples, primitives::DEFAULT_WINDOW, primitives::DEFAULT_HOP);
        let (centroid, bandwidth, _rolloff) =
            primitives::spectral_shape(&mag_spec, SAMPLE_RATE, 0.85);
        let onset = primitives::onset_strength(&mag_spec);

        // The two heaviest, genuinely independent sub-extractors (beat
        // tracking and key/chroma) run in parallel; everything downstream of
        // them (perceptual scalars, style, structure, vocal split) has a real
        // data dependency on their output, so it runs after rather than being
        // forced into a wider parallel tree.
        let (tempo_result, key_result) = rayon::join(
            || tempo::extract(&onset, duration),
            || key::extract(samples, SAMPLE_RATE),
        );

        let tempo_result = match tempo_result {
            Ok(t) => Some(t),
            Err(e) => {
                analysis_error.push(format!("tempo: {e}"));
                None
            }
        };
        let key_result = match key_result {
            Ok(k) => Some(k),
            Err(e) => {
                analysis_error.push(format!("key: {e}"));
                None
            }
        };

        let vocal_result = match vocal::extract(&centroid, primitives::DEFAULT_HOP, SAMPLE_RATE, duration)
        {
            Ok(v) => Some(v),
            Err(e) => {
                analysis_error.push(format!("vocal: {e}"));
                None
            }
        };

        let bpm = tempo_result.as_ref().map(|t| t.bpm);
        let beat_grid = tempo_result.as_ref().map(|t| t.beat_grid.clone());
        let (major_corr, minor_corr) = key_result
            .as_ref()
            .map_or((0.0, 0.0), |k| (k.major_corr, k.minor_corr));
        let vocal_energy_ratio = vocal_result.as_ref().map_or(0.0, |v| v.vocal_energy_ratio);

        let perceptual = perceptual::extract(perceptual::Inputs {
            samples,
            rms: &rms,
            zcr: &zcr,
            onset: &onset,
            centroid: &centroid,
            bandwidth: &bandwidth,
            magnitude_spectrogram: &mag_spec,
            sample_rate: SAMPLE_RATE,
            bpm: bpm.unwrap_or(0.0),
            beat_regularity: beat_grid.as_ref().map_or(0.0, |g| g.regularity),
            autocorrelation_peak_ratio: tempo_result
                .as_ref()
                .map_or(0.0, |t| t.autocorrelation_peak_ratio),
            major_corr,
            minor_corr,
            vocal_energy_ratio,
        });

        let style = style::extract(style::Inputs {
            samples,
            onset: &onset,
            bandwidth: &bandwidth,
            beat_regularity: beat_grid.as_ref().map_or(0.0, |g| g.regularity),
            vocal_energy_ratio,
            acousticness: perceptual.acousticness,
            sample_rate: SAMPLE_RATE,
        });

        let sections = match structure::extract(
            &rms,
            primitives::DEFAULT_WINDOW,
            primitives::DEFAULT_HOP,
            SAMPLE_RATE,
            duration,
            beat_grid.as_ref(),
        ) {
            Ok(s) => Some(s),
            Err(e) => {
                analysis_error.push(format!("structure: {e}"));
                None
            }
        };

        let (dominant_style, style_confidence) = style.dominant();

        Ok(Self {
            bpm,
            key: key_result.as_ref().and_then(|k| k.key),
            key_confidence: key_result.as_ref().map_or(0.0, |k| k.confidence),

            energy: Some(perceptual.energy),
            danceability: Some(perceptual.danceability),
            valence: Some(perceptual.valence),
            acousticness: Some(perceptual.acousticness),
            instrumentalness: Some(perceptual.instrumentalness),
            liveness: Some(perceptual.liveness),
            speechiness: Some(perceptual.speechiness),
            loudness: Some(perceptual.loudness),

            beat_grid,
            style: Some(style),
            dominant_style: Some(dominant_style),
            style_confidence,
            sections,
            vocal_intervals: vocal_result.as_ref().map_or_else(Vec::new, |v| v.vocal_intervals.clone()),
            instrumental_intervals: vocal_result
                .as_ref()
                .map_or_else(Vec::new, |v| v.instrumental_intervals.clone()),

            analysis_version: ANALYSIS_VERSION,
            analyzed_at: None,
            analysis_error,
        })
    }
}
