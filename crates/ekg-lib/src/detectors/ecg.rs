use crate::{
    dsp::filters::{
        butterworth_bandpass, filtfilt, five_point_derivative, moving_window_integration, square,
    },
    error::{AnalysisError, AnalysisResult},
    signal::{seconds_to_samples, BeatIndex, Beats, Signal},
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Configurable parameters for the Pan–Tompkins beat detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Lower band edge of the QRS band-pass (Hz).
    pub lowcut_hz: f64,
    /// Upper band edge of the QRS band-pass (Hz).
    pub highcut_hz: f64,
    /// Moving window integration length (seconds), roughly one QRS duration.
    pub integration_window_s: f64,
    /// Minimum physiological distance between two beats (seconds).
    pub refractory_s: f64,
    /// Leading span used to seed the signal/noise estimators (seconds).
    pub learning_window_s: f64,
    /// Half-width of the R-peak refinement window on the original signal (seconds).
    pub refine_window_s: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            lowcut_hz: 5.0,
            highcut_hz: 15.0,
            integration_window_s: 0.150,
            refractory_s: 0.200,
            learning_window_s: 2.0,
            refine_window_s: 0.050,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        let positive = [
            ("integration_window_s", self.integration_window_s),
            ("refractory_s", self.refractory_s),
            ("learning_window_s", self.learning_window_s),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(AnalysisError::InvalidParameter(format!(
                    "detector.{name} must be positive, got {value}"
                )));
            }
        }
        if !(self.refine_window_s.is_finite() && self.refine_window_s >= 0.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "detector.refine_window_s must not be negative, got {}",
                self.refine_window_s
            )));
        }
        if !(self.lowcut_hz >= 0.0 && self.lowcut_hz < self.highcut_hz) {
            return Err(AnalysisError::InvalidParameter(format!(
                "detector band must satisfy 0 <= lowcut < highcut, got {}..{} Hz",
                self.lowcut_hz, self.highcut_hz
            )));
        }
        Ok(())
    }
}

/// Intermediate signals of the enhancement cascade.
#[derive(Debug, Clone)]
pub struct QrsEnvelope {
    pub bandpassed: Vec<f64>,
    pub integrated: Vec<f64>,
}

/// Band-pass → derivative → squaring → moving-window integration.
pub fn pan_tompkins_envelope(signal: &Signal, cfg: &DetectorConfig) -> QrsEnvelope {
    let fs = signal.fs();
    let sections = butterworth_bandpass(cfg.lowcut_hz, cfg.highcut_hz, fs);
    let bandpassed = filtfilt(&sections, signal.data());
    let squared = square(&five_point_derivative(&bandpassed));
    let win = seconds_to_samples(cfg.integration_window_s, fs).max(1);
    let integrated = moving_window_integration(&squared, win);
    debug!(
        "envelope: {} samples, {} filter sections, integration width {win}",
        integrated.len(),
        sections.len()
    );
    QrsEnvelope {
        bandpassed,
        integrated,
    }
}

/// How an examined local maximum compares with the current thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakClass {
    /// Above `threshold1`: a beat.
    Signal,
    /// Between `threshold2` and `threshold1`: a search-back candidate.
    Weak,
    /// At or below `threshold2`.
    Noise,
}

/// Running signal/noise peak estimators and the two decision thresholds
/// derived from them. Owned by a single detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdState {
    pub spki: f64,
    pub npki: f64,
    pub threshold1: f64,
    pub threshold2: f64,
}

impl ThresholdState {
    pub fn with_estimates(spki: f64, npki: f64) -> Self {
        let mut state = Self {
            spki,
            npki,
            threshold1: 0.0,
            threshold2: 0.0,
        };
        state.refresh_thresholds();
        state
    }

    /// Seed from the learning span: `spki = 0.25 * max`, `npki = 0.5 * mean`.
    pub fn from_learning_window(window: &[f64]) -> Self {
        if window.is_empty() {
            return Self::with_estimates(0.0, 0.0);
        }
        let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        Self::with_estimates(0.25 * max, 0.5 * mean)
    }

    pub fn classify(&self, value: f64) -> PeakClass {
        if value > self.threshold1 {
            PeakClass::Signal
        } else if value > self.threshold2 {
            PeakClass::Weak
        } else {
            PeakClass::Noise
        }
    }

    pub fn observe_signal(&mut self, value: f64) {
        self.spki = 0.125 * value + 0.875 * self.spki;
    }

    /// Partial-weight update for a beat recovered by search-back.
    pub fn observe_recovered(&mut self, value: f64) {
        self.spki = 0.25 * value + 0.75 * self.spki;
    }

    pub fn observe_noise(&mut self, value: f64) {
        self.npki = 0.125 * value + 0.875 * self.npki;
    }

    pub fn refresh_thresholds(&mut self) {
        self.threshold1 = self.npki + 0.25 * (self.spki - self.npki);
        self.threshold2 = 0.5 * self.threshold1;
    }
}

/// Indices of strict local maxima, in order.
pub fn local_maxima(data: &[f64]) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }
    (1..data.len() - 1)
        .filter(|&i| data[i] > data[i - 1] && data[i] > data[i + 1])
        .collect()
}

/// Bounded sub-scan over `range` of the integrated signal.
///
/// Returns the first index holding the range maximum when that maximum
/// exceeds `threshold2`.
pub fn search_back(integrated: &[f64], range: Range<usize>, threshold2: f64) -> Option<usize> {
    let end = range.end.min(integrated.len());
    let mut best: Option<(usize, f64)> = None;
    for i in range.start..end {
        let value = integrated[i];
        if best.map_or(true, |(_, v)| value > v) {
            best = Some((i, value));
        }
    }
    best.filter(|&(_, v)| v > threshold2).map(|(i, _)| i)
}

/// Beats in the integration domain, plus the estimator state the scan ended with.
#[derive(Debug, Clone)]
pub struct PeakScan {
    pub peaks: Vec<usize>,
    pub recovered: usize,
    pub state: ThresholdState,
}

/// Adaptive dual-threshold scan over the local maxima of `integrated`.
///
/// Maxima within `refractory` samples of the last accepted beat are skipped.
/// A weak maximum triggers one search-back between the last accepted beat
/// (plus the refractory gap) and its own index; the noise estimate absorbs the
/// weak value whether or not a beat is recovered. Thresholds are refreshed
/// after every examined maximum.
pub fn scan_peaks(integrated: &[f64], learning_len: usize, refractory: usize) -> PeakScan {
    let learning = &integrated[..learning_len.min(integrated.len())];
    let mut state = ThresholdState::from_learning_window(learning);
    let mut peaks: Vec<usize> = Vec::new();
    let mut last_beat: Option<usize> = None;
    let mut recovered = 0;

    for idx in local_maxima(integrated) {
        if let Some(last) = last_beat {
            if idx - last < refractory {
                continue;
            }
        }
        let value = integrated[idx];
        match state.classify(value) {
            PeakClass::Signal => {
                peaks.push(idx);
                last_beat = Some(idx);
                state.observe_signal(value);
            }
            PeakClass::Weak => {
                if let Some(last) = last_beat {
                    let start = last + refractory;
                    if start < idx {
                        if let Some(found) = search_back(integrated, start..idx, state.threshold2)
                        {
                            if found - last >= refractory {
                                peaks.push(found);
                                last_beat = Some(found);
                                recovered += 1;
                                state.observe_recovered(integrated[found]);
                            }
                        }
                    }
                }
                state.observe_noise(value);
            }
            PeakClass::Noise => state.observe_noise(value),
        }
        state.refresh_thresholds();
    }

    PeakScan {
        peaks,
        recovered,
        state,
    }
}

/// Move each integration-domain beat to the sample of largest absolute
/// amplitude in `original` within `[peak - half_width, peak + half_width)`.
pub fn refine_peaks(peaks: &[usize], original: &[f64], half_width: usize) -> Vec<usize> {
    peaks
        .iter()
        .map(|&peak| {
            let start = peak.saturating_sub(half_width);
            let end = (peak + half_width).min(original.len());
            let mut best = start;
            let mut best_value = f64::NEG_INFINITY;
            for (i, sample) in original.iter().enumerate().take(end).skip(start) {
                if sample.abs() > best_value {
                    best_value = sample.abs();
                    best = i;
                }
            }
            best
        })
        .collect()
}

/// Keep beats in ascending order with at least `refractory` samples between
/// neighbours, preferring the earlier beat of a conflicting pair.
fn enforce_refractory(refined: Vec<usize>, refractory: usize) -> Vec<BeatIndex> {
    let mut kept: Vec<BeatIndex> = Vec::with_capacity(refined.len());
    for beat in refined {
        match kept.last() {
            Some(&prev) if beat < prev + refractory.max(1) => {
                warn!("dropping refined beat {beat}: within refractory gap of {prev}");
            }
            _ => kept.push(beat),
        }
    }
    kept
}

/// Detect R-peaks with the default configuration.
pub fn detect_r_peaks(signal: &Signal) -> AnalysisResult<Beats> {
    detect_r_peaks_with_config(signal, &DetectorConfig::default())
}

/// Detect R-peaks using the configurable pipeline.
///
/// Fails with [`AnalysisError::InsufficientSignal`] when the signal is shorter
/// than the estimator learning window.
pub fn detect_r_peaks_with_config(signal: &Signal, cfg: &DetectorConfig) -> AnalysisResult<Beats> {
    cfg.validate()?;
    let fs = signal.fs();
    let learning_len = seconds_to_samples(cfg.learning_window_s, fs).max(1);
    if signal.len() < learning_len {
        return Err(AnalysisError::InsufficientSignal {
            required: learning_len,
            actual: signal.len(),
        });
    }
    let refractory = seconds_to_samples(cfg.refractory_s, fs).max(1);
    let half_width = seconds_to_samples(cfg.refine_window_s, fs);

    let envelope = pan_tompkins_envelope(signal, cfg);
    let scan = scan_peaks(&envelope.integrated, learning_len, refractory);
    debug!(
        "scan accepted {} beats ({} via search-back); final spki={:.4e} npki={:.4e}",
        scan.peaks.len(),
        scan.recovered,
        scan.state.spki,
        scan.state.npki
    );
    let refined = refine_peaks(&scan.peaks, signal.data(), half_width);
    Ok(Beats::from_indices(enforce_refractory(refined, refractory)))
}
