//! Frame-level signal features built on top of [`crate::utils::stft`].
//!
//! Every function here is pure and deterministic over a mono f32 PCM buffer
//! at [`crate::SAMPLE_RATE`]; none of them touch the filesystem or hold state
//! across calls.

use ndarray::{s, Array, Array2, Axis};

use crate::utils::{hz_to_octs_inplace, number_crossings, stft};

pub const DEFAULT_WINDOW: usize = 2048;
pub const DEFAULT_HOP: usize = 512;
const N_CHROMA: u32 = 12;

/// Magnitude STFT at the crate's default window/hop, shape `(n_bins, n_frames)`.
#[must_use]
pub fn magnitude_spectrogram(signal: &[f32]) -> Array2<f64> {
    stft(signal, DEFAULT_WINDOW, DEFAULT_HOP)
}

/// RMS energy per frame.
#[must_use]
pub fn frame_rms(signal: &[f32], window_length: usize, hop_length: usize) -> Vec<f32> {
    if signal.len() < window_length {
        return vec![(signal.iter().map(|x| x * x).sum::<f32>() / signal.len().max(1) as f32)
            .sqrt()];
    }
    signal
        .windows(window_length)
        .step_by(hop_length)
        .map(|w| (w.iter().map(|x| x * x).sum::<f32>() / window_length as f32).sqrt())
        .collect()
}

/// Zero-crossing rate per frame (fraction of samples where the sign flips).
#[must_use]
pub fn zero_crossing_rate(signal: &[f32], window_length: usize, hop_length: usize) -> Vec<f32> {
    if signal.len() < window_length {
        return vec![number_crossings(signal) as f32 / signal.len().max(1) as f32];
    }
    signal
        .windows(window_length)
        .step_by(hop_length)
        .map(|w| number_crossings(w) as f32 / window_length as f32)
        .collect()
}

/// Per-frame spectral centroid, bandwidth, and rolloff (at `rolloff_pct` of
/// cumulative energy), all in Hz.
#[must_use]
pub fn spectral_shape(
    magnitude_spec: &Array2<f64>,
    sample_rate: u32,
    rolloff_pct: f64,
) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let n_bins = magnitude_spec.len_of(Axis(0));
    let n_frames = magnitude_spec.len_of(Axis(1));
    let freqs: Vec<f64> = Array::linspace(0., f64::from(sample_rate) / 2., n_bins).to_vec();

    let mut centroid = Vec::with_capacity(n_frames);
    let mut bandwidth = Vec::with_capacity(n_frames);
    let mut rolloff = Vec::with_capacity(n_frames);

    for frame in magnitude_spec.axis_iter(Axis(1)) {
        let total: f64 = frame.sum();
        if total <= f64::EPSILON {
            centroid.push(0.);
            bandwidth.push(0.);
            rolloff.push(0.);
            continue;
        }

        let c = freqs
            .iter()
            .zip(frame.iter())
            .map(|(f, m)| f * m)
            .sum::<f64>()
            / total;
        let bw = (freqs
            .iter()
            .zip(frame.iter())
            .map(|(f, m)| m * (f - c).powi(2))
            .sum::<f64>()
            / total)
            .sqrt();

        let threshold = rolloff_pct * total;
        let mut cumulative = 0.;
        let mut roll = *freqs.last().unwrap_or(&0.);
        for (f, m) in freqs.iter().zip(frame.iter()) {
            cumulative += m;
            if cumulative >= threshold {
                roll = *f;
                break;
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        {
            centroid.push(c as f32);
            bandwidth.push(bw as f32);
            rolloff.push(roll as f32);
        }
    }

    (centroid, bandwidth, rolloff)
}

/// Per-frame ratio of energy in `[low_hz, high_hz)` to total frame energy.
#[must_use]
pub fn band_energy_ratio(
    magnitude_spec: &Array2<f64>,
    sample_rate: u32,
    low_hz: f64,
    high_hz: f64,
) -> Vec<f32> {
    let n_bins = magnitude_spec.len_of(Axis(0));
    let freqs: Vec<f64> = Array::linspace(0., f64::from(sample_rate) / 2., n_bins).to_vec();

    magnitude_spec
        .axis_iter(Axis(1))
        .map(|frame| {
            let total: f64 = frame.iter().map(|x| x * x).sum();
            if total <= f64::EPSILON {
                return 0.0;
            }
            let band: f64 = freqs
                .iter()
                .zip(frame.iter())
                .filter(|(f, _)| **f >= low_hz && **f < high_hz)
                .map(|(_, m)| m * m)
                .sum();
            #[allow(clippy::cast_possible_truncation)]
            {
                (band / total) as f32
            }
        })
        .collect()
}

/// Per-frame spectral contrast: mean, across `n_bands` log-spaced sub-bands,
/// of `log(peak / valley)` energy within each band.
#[must_use]
pub fn spectral_contrast(magnitude_spec: &Array2<f64>, sample_rate: u32, n_bands: usize) -> Vec<f32> {
    let n_bins = magnitude_spec.len_of(Axis(0));
    let freqs: Vec<f64> = Array::linspace(0., f64::from(sample_rate) / 2., n_bins).to_vec();
    let fmin = 20.0f64;
    let fmax = f64::from(sample_rate) / 2.0;
    let edges: Vec<f64> = (0..=n_bands)
        .map(|i| fmin * (fmax / fmin).powf(i as f64 / n_bands as f64))
        .collect();

    magnitude_spec
        .axis_iter(Axis(1))
        .map(|frame| {
            let mut contrasts = Vec::with_capacity(n_bands);
            for w in edges.windows(2) {
                let (lo, hi) = (w[0], w[1]);
                let band: Vec<f64> = freqs
                    .iter()
                    .zip(frame.iter())
                    .filter(|(f, _)| **f >= lo && **f < hi)
                    .map(|(_, m)| *m)
                    .collect();
                if band.is_empty() {
                    continue;
                }
                let peak = band.iter().cloned().fold(0.0, f64::max).max(1e-6);
                let valley = band.iter().cloned().fold(f64::MAX, f64::min).max(1e-6);
                contrasts.push((peak / valley).ln());
            }
            let mean = if contrasts.is_empty() {
                0.0
            } else {
                contrasts.iter().sum::<f64>() / contrasts.len() as f64
            };
            #[allow(clippy::cast_possible_truncation)]
            {
                mean as f32
            }
        })
        .collect()
}

/// Onset-strength envelope via spectral flux: positive frame-to-frame
/// increase in magnitude, summed across bins.
#[must_use]
pub fn onset_strength(magnitude_spec: &Array2<f64>) -> Vec<f32> {
    let n_frames = magnitude_spec.len_of(Axis(1));
    if n_frames == 0 {
        return Vec::new();
    }

    let mut envelope = Vec::with_capacity(n_frames);
    envelope.push(0.0f32);
    for t in 1..n_frames {
        let prev = magnitude_spec.column(t - 1);
        let cur = magnitude_spec.column(t);
        #[allow(clippy::cast_possible_truncation)]
        let flux = cur
            .iter()
            .zip(prev.iter())
            .map(|(c, p)| (c - p).max(0.))
            .sum::<f64>() as f32;
        envelope.push(flux);
    }

    let max = envelope.iter().cloned().fold(0.0f32, f32::max);
    if max > f32::EPSILON {
        envelope.iter_mut().for_each(|v| *v /= max);
    }
    envelope
}

/// Librosa-style chroma filterbank: maps FFT bins to 12 pitch classes with a
/// Gaussian window in log-frequency space, generalized from
/// `mecomp-analysis`'s own STFT-based chroma computation but fixed at 12
/// bins and zero tuning offset (no microtonal correction).
fn chroma_filter(sample_rate: u32, n_fft: usize) -> Array2<f64> {
    let ctroct = 5.0;
    let octwidth = 2.;
    let n_chroma_float = f64::from(N_CHROMA);
    let n_chroma2 = (n_chroma_float / 2.0).round();

    let frequencies = Array::linspace(0., f64::from(sample_rate), n_fft + 1);
    let mut freq_bins = frequencies;
    hz_to_octs_inplace(&mut freq_bins, 0.0, N_CHROMA);
    freq_bins.mapv_inplace(|x| x * n_chroma_float);
    freq_bins[0] = 1.5f64.mul_add(-n_chroma_float, freq_bins[1]);

    let mut binwidth_bins = Array::ones(freq_bins.raw_dim());
    binwidth_bins.slice_mut(s![0..freq_bins.len() - 1]).assign(
        &(&freq_bins.slice(s![1..]) - &freq_bins.slice(s![..-1]))
            .mapv(|x| if x <= 1. { 1. } else { x }),
    );

    let mut d: Array2<f64> = Array::zeros((N_CHROMA as usize, freq_bins.len()));
    for (idx, mut row) in d.rows_mut().into_iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        row.fill(idx as f64);
    }
    d = -d + &freq_bins;
    d.mapv_inplace(|x| 10f64.mul_add(n_chroma_float, x + n_chroma2) % n_chroma_float - n_chroma2);
    d /= &binwidth_bins;
    d.mapv_inplace(|x| (-0.5 * (2. * x) * (2. * x)).exp());

    let mut wts = d;
    for mut col in wts.columns_mut() {
        let mut sum = col.mapv(|x| x * x).sum().sqrt();
        if sum < f64::MIN_POSITIVE {
            sum = 1.;
        }
        col /= sum;
    }

    freq_bins.mapv_inplace(|x| (-0.5 * ((x / n_chroma_float - ctroct) / octwidth).powi(2)).exp());
    wts *= &freq_bins;

    let mut rolled = Array2::zeros(wts.dim());
    rolled.slice_mut(s![-3.., ..]).assign(&wts.slice(s![..3, ..]));
    rolled.slice_mut(s![..-3, ..]).assign(&wts.slice(s![3.., ..]));

    let non_aliased = 1 + n_fft / 2;
    rolled.slice_move(s![.., ..non_aliased])
}

/// 12-bin chromagram, shape `(12, n_frames)`, each column L1-normalized.
#[must_use]
pub fn chromagram(signal: &[f32], sample_rate: u32, n_fft: usize, hop: usize) -> Array2<f64> {
    let mut power = stft(signal, n_fft, hop);
    power.mapv_inplace(|x| x * x);

    let filter = chroma_filter(sample_rate, n_fft);
    let mut raw = filter.dot(&power);
    for mut col in raw.columns_mut() {
        let mut sum = col.mapv(f64::abs).sum();
        if sum < f64::MIN_POSITIVE {
            sum = 1.;
        }
        col /= sum;
    }
    raw
}

/// Triangular mel filterbank, shape `(n_mels, n_bins)`.
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Array2<f64> {
    let hz_to_mel = |f: f64| 2595. * (1. + f / 700.).log10();
    let mel_to_hz = |m: f64| 700. * (10f64.powf(m / 2595.) - 1.);

    let n_bins = n_fft / 2 + 1;
    let fmax = f64::from(sample_rate) / 2.;
    let mel_max = hz_to_mel(fmax);
    let mel_points: Vec<f64> = (0..=n_mels + 1)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();
    let bin_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * f64::from(sample_rate) / n_fft as f64)
        .collect();

    let mut filters = Array2::zeros((n_mels, n_bins));
    for m in 0..n_mels {
        let (left, center, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
        for (k, &f) in bin_freqs.iter().enumerate() {
            let weight = if f < left || f > right {
                0.
            } else if f <= center {
                (f - left) / (center - left).max(f64::MIN_POSITIVE)
            } else {
                (right - f) / (right - center).max(f64::MIN_POSITIVE)
            };
            filters[[m, k]] = weight;
        }
    }
    filters
}

/// `n_mfcc` MFCCs via a mel filterbank, log energy, and a type-II DCT; shape
/// `(n_mfcc, n_frames)`.
#[must_use]
pub fn mfcc(signal: &[f32], sample_rate: u32, n_mfcc: usize) -> Array2<f64> {
    const N_MELS: usize = 26;

    let mut power = stft(signal, DEFAULT_WINDOW, DEFAULT_HOP);
    power.mapv_inplace(|x| x * x);

    let filterbank = mel_filterbank(sample_rate, DEFAULT_WINDOW, N_MELS);
    let mel_energy = filterbank.dot(&power);
    let log_mel = mel_energy.mapv(|x| (x + 1e-10).ln());

    let n_frames = log_mel.len_of(Axis(1));
    let mut coeffs = Array2::zeros((n_mfcc, n_frames));
    for (k, mut row) in coeffs.rows_mut().into_iter().enumerate() {
        for (t, frame) in log_mel.axis_iter(Axis(1)).enumerate() {
            let sum: f64 = frame
                .iter()
                .enumerate()
                .map(|(n, &x)| {
                    x * (std::f64::consts::PI / N_MELS as f64
                        * (n as f64 + 0.5)
                        * k as f64)
                        .cos()
                })
                .sum();
            row[t] = sum;
        }
    }
    coeffs
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
    fn frame_rms_of_silence_is_zero() {
        let silence = vec![0.0f32; 4096];
        let rms = frame_rms(&silence, 1024, 512);
        assert!(rms.iter().all(|&v| v.abs() < f32::EPSILON));
    }

    #[test]
    fn zero_crossing_rate_of_dc_signal_is_zero() {
        let dc = vec![1.0f32; 4096];
        let zcr = zero_crossing_rate(&dc, 1024, 512);
        assert!(zcr.iter().all(|&v| v.abs() < f32::EPSILON));
    }

    #[test]
    fn spectral_centroid_tracks_tone_frequency() {
        let signal = sine(1000., crate::SAMPLE_RATE, 1.0);
        let spec = magnitude_spectrogram(&signal);
        let (centroid, _, _) = spectral_shape(&spec, crate::SAMPLE_RATE, 0.85);
        let mean_centroid = centroid.iter().sum::<f32>() / centroid.len() as f32;
        assert!(
            (mean_centroid - 1000.).abs() < 200.,
            "expected centroid near 1000 Hz, got {mean_centroid}"
        );
    }

    #[test]
    fn chromagram_columns_sum_to_one() {
        let signal = sine(440., crate::SAMPLE_RATE, 1.0);
        let chroma = chromagram(&signal, crate::SAMPLE_RATE, 4096, 2048);
        for col in chroma.columns() {
            let sum = col.mapv(f64::abs).sum();
            assert!((sum - 1.0).abs() < 1e-6 || sum == 0.0);
        }
    }

    #[test]
    fn mfcc_shape_matches_requested_coefficients() {
        let signal = sine(220., crate::SAMPLE_RATE, 1.0);
        let coeffs = mfcc(&signal, crate::SAMPLE_RATE, 13);
        assert_eq!(coeffs.len_of(Axis(0)), 13);
    }
}
