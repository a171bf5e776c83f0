//! Filter primitives for the QRS enhancement cascade.
//!
//! Second-order sections use the Direct Form II Transposed structure. The
//! zero-phase helper runs a cascade forward and then backward over an
//! odd-extended copy of the input, seeding each pass with the steady-state
//! response to the first sample so that edges do not ring.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// One second-order section: H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self { b, a }
    }

    /// Second-order Butterworth low-pass via the bilinear transform with prewarping.
    pub fn butterworth_lowpass(cutoff_hz: f64, fs: f64) -> Self {
        let (k, norm, a1, a2) = butterworth_terms(cutoff_hz, fs);
        let b0 = k * k * norm;
        Self::new([b0, 2.0 * b0, b0], [a1, a2])
    }

    /// Second-order Butterworth high-pass via the bilinear transform with prewarping.
    pub fn butterworth_highpass(cutoff_hz: f64, fs: f64) -> Self {
        let (_, norm, a1, a2) = butterworth_terms(cutoff_hz, fs);
        Self::new([norm, -2.0 * norm, norm], [a1, a2])
    }

    /// Gain at 0 Hz.
    pub fn dc_gain(&self) -> f64 {
        let den = 1.0 + self.a[0] + self.a[1];
        if den.abs() < f64::EPSILON {
            return 0.0;
        }
        (self.b[0] + self.b[1] + self.b[2]) / den
    }

    /// Filter state after the section has settled on a constant input `level`.
    fn steady_state(&self, level: f64) -> [f64; 2] {
        let out = self.dc_gain() * level;
        let s1 = self.b[2] * level - self.a[1] * out;
        let s0 = self.b[1] * level - self.a[0] * out + s1;
        [s0, s1]
    }

    fn run(&self, data: &mut [f64], mut state: [f64; 2]) {
        for x in data.iter_mut() {
            let input = *x;
            let output = self.b[0] * input + state[0];
            state[0] = self.b[1] * input - self.a[0] * output + state[1];
            state[1] = self.b[2] * input - self.a[1] * output;
            *x = output;
        }
    }
}

fn butterworth_terms(cutoff_hz: f64, fs: f64) -> (f64, f64, f64, f64) {
    let q = FRAC_1_SQRT_2;
    let k = (PI * cutoff_hz / fs).tan();
    let norm = 1.0 / (1.0 + k / q + k * k);
    let a1 = 2.0 * (k * k - 1.0) * norm;
    let a2 = (1.0 - k / q + k * k) * norm;
    (k, norm, a1, a2)
}

/// Band-pass cascade: high-pass at `low_hz` followed by low-pass at `high_hz`.
///
/// The low-pass stage is omitted when `high_hz` is at or above Nyquist, and the
/// high-pass stage when `low_hz` is not positive.
pub fn butterworth_bandpass(low_hz: f64, high_hz: f64, fs: f64) -> Vec<Biquad> {
    let mut sections = Vec::with_capacity(2);
    if low_hz > 0.0 && low_hz < fs * 0.5 {
        sections.push(Biquad::butterworth_highpass(low_hz, fs));
    }
    if high_hz > 0.0 && high_hz < fs * 0.5 {
        sections.push(Biquad::butterworth_lowpass(high_hz, fs));
    }
    sections
}

fn apply_cascade(sections: &[Biquad], data: &mut [f64]) {
    let Some(&first) = data.first() else {
        return;
    };
    let mut level = first;
    for section in sections {
        let state = section.steady_state(level);
        level *= section.dc_gain();
        section.run(data, state);
    }
}

/// Zero-phase filtering: forward pass, then backward pass, over an odd
/// extension of `3 * (2 * sections + 1)` samples at each edge.
pub fn filtfilt(sections: &[Biquad], data: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n == 0 || sections.is_empty() {
        return data.to_vec();
    }
    let pad = (3 * (2 * sections.len() + 1)).min(n - 1);

    let mut ext = Vec::with_capacity(n + 2 * pad);
    let (first, last) = (data[0], data[n - 1]);
    ext.extend((1..=pad).rev().map(|i| 2.0 * first - data[i]));
    ext.extend_from_slice(data);
    ext.extend((1..=pad).map(|i| 2.0 * last - data[n - 1 - i]));

    apply_cascade(sections, &mut ext);
    ext.reverse();
    apply_cascade(sections, &mut ext);
    ext.reverse();

    ext[pad..pad + n].to_vec()
}

/// Five-point derivative `(-x[i-2] - 2x[i-1] + 2x[i+1] + x[i+2]) / 8`.
/// The first and last two samples stay zero.
pub fn five_point_derivative(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    let mut out = vec![0.0; n];
    for i in 2..n.saturating_sub(2) {
        out[i] = (-data[i - 2] - 2.0 * data[i - 1] + 2.0 * data[i + 1] + data[i + 2]) / 8.0;
    }
    out
}

pub fn square(data: &[f64]) -> Vec<f64> {
    data.iter().map(|x| x * x).collect()
}

/// Centered boxcar average of width `win`.
///
/// Output `i` averages `data[i + c + 1 - win ..= i + c]` with `c = (win - 1) / 2`,
/// counting samples beyond either edge as zero, so a bump keeps its position.
pub fn moving_window_integration(data: &[f64], win: usize) -> Vec<f64> {
    let n = data.len();
    if n == 0 || win <= 1 {
        return data.to_vec();
    }
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &x in data {
        acc += x;
        prefix.push(acc);
    }
    let center = (win - 1) / 2;
    (0..n)
        .map(|i| {
            let hi = (i + center + 1).min(n);
            let lo = (i + center + 1).saturating_sub(win).min(hi);
            (prefix[hi] - prefix[lo]) / win as f64
        })
        .collect()
}
