use crate::{
    dsp::resample::{resample_fft, resampled_len},
    error::{AnalysisError, AnalysisResult},
    signal::Signal,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Sample rate the analysis stages (and the external classifier) operate at.
pub const DEFAULT_ANALYSIS_RATE_HZ: f64 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditioningConfig {
    /// Target rate of the conditioned signal (Hz).
    pub analysis_rate_hz: f64,
}

impl Default for ConditioningConfig {
    fn default() -> Self {
        Self {
            analysis_rate_hz: DEFAULT_ANALYSIS_RATE_HZ,
        }
    }
}

impl ConditioningConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        let target = self.analysis_rate_hz;
        if !(target.is_finite() && target > 0.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "conditioning.analysis_rate_hz must be positive, got {target}"
            )));
        }
        Ok(())
    }
}

/// Turn raw device samples into a canonical analysis-rate signal.
///
/// Non-finite samples become `0.0`, the sequence is resampled to
/// `cfg.analysis_rate_hz` when the rates differ, and amplitudes are divided by
/// the largest absolute sample unless the signal is flat.
pub fn condition(
    raw: &[f64],
    source_rate: f64,
    cfg: &ConditioningConfig,
) -> AnalysisResult<Signal> {
    if raw.is_empty() {
        return Err(AnalysisError::InvalidInput("raw signal is empty".into()));
    }
    if !(source_rate.is_finite() && source_rate > 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "source sample rate must be positive, got {source_rate}"
        )));
    }
    cfg.validate()?;
    let target = cfg.analysis_rate_hz;

    let sanitized = sanitize(raw);
    let mut data = if source_rate != target {
        let len = resampled_len(sanitized.len(), source_rate, target);
        if len == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "{} samples at {source_rate} Hz resample to nothing at {target} Hz",
                raw.len()
            )));
        }
        debug!(
            "resampling {} samples from {source_rate} Hz to {len} samples at {target} Hz",
            sanitized.len()
        );
        resample_fft(&sanitized, len)?
    } else {
        sanitized
    };
    normalize(&mut data);
    Signal::new(target, data)
}

fn sanitize(raw: &[f64]) -> Vec<f64> {
    raw.iter()
        .map(|&x| if x.is_finite() { x } else { 0.0 })
        .collect()
}

fn normalize(data: &mut [f64]) {
    let peak = data.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    if peak > 0.0 {
        data.iter_mut().for_each(|x| *x /= peak);
    }
}
