use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

/// Integer sample offset into a [`Signal`] at which a beat is asserted.
pub type BeatIndex = usize;

/// Uniformly sampled single-lead signal.
///
/// The sample rate is validated on construction and the samples cannot be
/// mutated afterwards; stages that transform a signal produce a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SignalFields")]
pub struct Signal {
    fs: f64,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct SignalFields {
    fs: f64,
    data: Vec<f64>,
}

impl TryFrom<SignalFields> for Signal {
    type Error = AnalysisError;

    fn try_from(fields: SignalFields) -> AnalysisResult<Self> {
        Signal::new(fields.fs, fields.data)
    }
}

impl Signal {
    pub fn new(fs: f64, data: Vec<f64>) -> AnalysisResult<Self> {
        if !(fs.is_finite() && fs > 0.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "sample rate must be a positive finite number, got {fs}"
            )));
        }
        Ok(Self { fs, data })
    }

    /// Sampling frequency in Hz.
    pub fn fs(&self) -> f64 {
        self.fs
    }
    pub fn data(&self) -> &[f64] {
        &self.data
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
    /// Number of whole samples spanning `seconds` at this rate.
    pub fn samples_for(&self, seconds: f64) -> usize {
        seconds_to_samples(seconds, self.fs)
    }
}

pub(crate) fn seconds_to_samples(seconds: f64, fs: f64) -> usize {
    (seconds * fs).round().max(0.0) as usize
}

/// Ordered beat locations (R-peaks) in samples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beats {
    pub indices: Vec<BeatIndex>,
}

impl Beats {
    pub fn from_indices(indices: Vec<BeatIndex>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
    pub fn is_strictly_increasing(&self) -> bool {
        self.indices.windows(2).all(|w| w[0] < w[1])
    }
}

/// RR intervals in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr_ms: Vec<f64>,
}

impl RRSeries {
    pub fn from_beats(beats: &Beats, fs: f64) -> Self {
        let rr_ms = beats
            .indices
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) * 1000.0 / fs)
            .collect();
        Self { rr_ms }
    }
    pub fn len(&self) -> usize {
        self.rr_ms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rr_ms.is_empty()
    }
    /// Successive differences `rr[i + 1] - rr[i]`.
    pub fn successive_differences(&self) -> Vec<f64> {
        self.rr_ms.windows(2).map(|w| w[1] - w[0]).collect()
    }
}
