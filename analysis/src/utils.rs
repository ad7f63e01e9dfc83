//! Low-level numeric helpers shared by every feature extractor.

use log::warn;
use ndarray::{arr1, s, Array, Array1, Array2};
use ndarray_stats::Quantile1dExt;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;

use crate::Feature;

#[must_use]
#[inline]
pub fn reflect_pad(array: &[f32], pad: usize) -> Vec<f32> {
    debug_assert!(pad < array.len(), "padding is too large");
    let prefix = array[1..=pad].iter().rev().copied().collect::<Vec<f32>>();
    let suffix = array[(array.len() - 2) - pad + 1..array.len() - 1]
        .iter()
        .rev()
        .copied()
        .collect::<Vec<f32>>();
    let mut output = Vec::with_capacity(prefix.len() + array.len() + suffix.len());

    output.extend(prefix);
    output.extend(array);
    output.extend(suffix);
    output
}

/// Short-time Fourier transform magnitude spectrogram.
///
/// Returns an `(n_fft / 2 + 1, n_frames)` matrix: frequency bins on the first
/// axis, time frames on the second, Hann-windowed with reflect padding at the
/// edges.
#[must_use]
#[allow(clippy::missing_inline_in_public_items)]
pub fn stft(signal: &[f32], window_length: usize, hop_length: usize) -> Array2<f64> {
    debug_assert!(window_length % 2 == 0, "window length must be even");
    debug_assert!(window_length < signal.len(), "signal is too short");
    debug_assert!(hop_length < window_length, "hop length is too large");
    // Take advantage of row-major order to have a contiguous window for the
    // `assign`, reversing the axes to the expected shape only at the end.
    let mut stft = Array2::zeros((signal.len().div_ceil(hop_length), window_length / 2 + 1));
    let signal = reflect_pad(signal, window_length / 2);

    // Periodic, so window_size + 1.
    let mut hann_window = Array::zeros(window_length + 1);
    #[allow(clippy::cast_precision_loss)]
    for n in 0..window_length {
        hann_window[[n]] =
            0.5f32.mul_add(-f32::cos(2. * n as f32 * PI / (window_length as f32)), 0.5);
    }
    hann_window = hann_window.slice_move(s![0..window_length]);
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(window_length);

    for (window, mut stft_col) in signal
        .windows(window_length)
        .step_by(hop_length)
        .zip(stft.rows_mut())
    {
        let mut signal = (arr1(window) * &hann_window).mapv(|x| Complex::new(x, 0.));
        if let Some(s) = signal.as_slice_mut() {
            fft.process(s);
        } else {
            warn!("non-contiguous slice found for stft; expect slow performance");
            fft.process(&mut signal.to_vec());
        }

        stft_col.assign(
            &signal
                .slice(s![..=window_length / 2])
                .mapv(|x| f64::from(x.re.hypot(x.im))),
        );
    }
    stft.permuted_axes((1, 0))
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean<T: Clone + Into<f32>>(input: &[T]) -> f32 {
    if input.is_empty() {
        return 0.;
    }
    input.iter().map(|x| x.clone().into()).sum::<f32>() / input.len() as f32
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn variance(input: &[f32]) -> f32 {
    if input.is_empty() {
        return 0.;
    }
    let m = mean(input);
    input.iter().map(|x| (x - m) * (x - m)).sum::<f32>() / input.len() as f32
}

pub(crate) trait Normalize {
    const MAX_VALUE: Feature;
    const MIN_VALUE: Feature;

    fn normalize(&self, value: Feature) -> Feature {
        2. * (value - Self::MIN_VALUE) / (Self::MAX_VALUE - Self::MIN_VALUE) - 1.
    }
}

// Essentia algorithm:
// https://github.com/MTG/essentia/blob/master/src/algorithms/temporal/zerocrossingrate.cpp
pub(crate) fn number_crossings(input: &[f32]) -> u32 {
    if input.is_empty() {
        return 0;
    }

    let mut crossings = 0;
    let mut was_positive = input[0] > 0.;

    for &sample in input {
        let is_positive = sample > 0.;
        if was_positive != is_positive {
            crossings += 1;
            was_positive = is_positive;
        }
    }

    crossings
}

/// Only works for input of size 256 (or at least of size a multiple of 8),
/// with values belonging to `[0; 2^65]`.
///
/// Finely optimized geometric mean courtesy of Jacques-Henri Jourdan
/// (<https://jhjourdan.mketjh.fr/>).
#[must_use]
#[allow(clippy::missing_inline_in_public_items)]
pub fn geometric_mean(input: &[f32]) -> f32 {
    debug_assert_eq!(input.len() % 8, 0, "input size must be a multiple of 8");
    if input.is_empty() {
        return 0.;
    }

    let mut exponents: i32 = 0;
    let mut mantissas: f64 = 1.;
    for ch in input.chunks_exact(8) {
        let mut m = (f64::from(ch[0]) * f64::from(ch[1])) * (f64::from(ch[2]) * f64::from(ch[3]));
        m *= 3.273_390_607_896_142e150; // 2^500: avoid underflows and denormals
        m *= (f64::from(ch[4]) * f64::from(ch[5])) * (f64::from(ch[6]) * f64::from(ch[7]));
        if m == 0. {
            return 0.;
        }
        exponents += (m.to_bits() >> 52) as i32;
        mantissas *= f64::from_bits((m.to_bits() & 0x000F_FFFF_FFFF_FFFF) | 0x3FF0_0000_0000_0000);
    }

    #[allow(clippy::cast_possible_truncation)]
    let n = input.len() as u32;
    #[allow(clippy::cast_possible_truncation)]
    let result = (((mantissas.log2() + f64::from(exponents)) / f64::from(n) - (1023. + 500.) / 8.)
        .exp2()) as f32;
    result
}

/// Value at `p` (in `[0, 1]`) of the sorted distribution of `values`,
/// nearest-rank.
#[must_use]
pub(crate) fn percentile(values: &[f32], p: f64) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    ndarray::arr1(values)
        .mapv(noisy_float::prelude::n32)
        .quantile_mut(noisy_float::prelude::n64(p), &ndarray_stats::interpolate::Nearest)
        .map(noisy_float::types::N32::raw)
        .unwrap_or(0.0)
}

pub(crate) fn hz_to_octs_inplace(
    frequencies: &mut Array1<f64>,
    tuning: f64,
    bins_per_octave: u32,
) -> &mut Array1<f64> {
    let a440 = 440.0 * (tuning / f64::from(bins_per_octave)).exp2();

    *frequencies /= a440 / 16.;
    frequencies.mapv_inplace(f64::log2);
    frequencies
}
