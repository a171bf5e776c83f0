use crate::{
    error::{AnalysisError, AnalysisResult},
    signal::{Beats, RRSeries},
};
use serde::{Deserialize, Serialize};

/// Reporting band for instantaneous heart rate (BPM).
pub const MIN_REPORTED_BPM: f64 = 30.0;
pub const MAX_REPORTED_BPM: f64 = 250.0;
/// Successive-difference cut-off for pNN50 (ms).
pub const NN50_MS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSummary {
    pub min_bpm: f64,
    pub avg_bpm: f64,
    pub max_bpm: f64,
    pub std_bpm: f64,
}

/// Time-domain HRV, computed on unclamped RR intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HRVTime {
    /// Number of RR intervals.
    pub n: usize,
    pub mean_rr_ms: f64,
    pub sdnn_ms: f64,
    pub rmssd_ms: f64,
    pub pnn50_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmStats {
    pub beat_count: usize,
    pub rr: RRSeries,
    /// Per-interval heart rate, clamped to the reporting band.
    pub instantaneous_bpm: Vec<f64>,
    pub heart_rate: HeartRateSummary,
    pub hrv: HRVTime,
}

/// Heart rate per RR interval, `60000 / rr_ms`, clamped to
/// [`MIN_REPORTED_BPM`, `MAX_REPORTED_BPM`].
pub fn instantaneous_bpm(rr: &RRSeries) -> Vec<f64> {
    rr.rr_ms
        .iter()
        .map(|&ms| (60_000.0 / ms).clamp(MIN_REPORTED_BPM, MAX_REPORTED_BPM))
        .collect()
}

pub fn hrv_time(rr: &RRSeries) -> HRVTime {
    let n = rr.len();
    let mean_rr_ms = mean(&rr.rr_ms);
    let sdnn_ms = population_std(&rr.rr_ms);
    let diffs = rr.successive_differences();
    let (rmssd_ms, pnn50_percent) = if diffs.is_empty() {
        (0.0, 0.0)
    } else {
        let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt();
        let nn50 = diffs.iter().filter(|d| d.abs() > NN50_MS).count();
        (rmssd, 100.0 * nn50 as f64 / diffs.len() as f64)
    };
    HRVTime {
        n,
        mean_rr_ms,
        sdnn_ms,
        rmssd_ms,
        pnn50_percent,
    }
}

/// RR, heart-rate and HRV statistics for an ordered beat sequence.
///
/// Requires at least two strictly increasing beats. With exactly two beats
/// RMSSD and pNN50 are reported as zero.
pub fn rhythm_statistics(beats: &Beats, fs: f64) -> AnalysisResult<RhythmStats> {
    if !(fs.is_finite() && fs > 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "sample rate must be positive, got {fs}"
        )));
    }
    if beats.len() < 2 {
        return Err(AnalysisError::InsufficientData { beats: beats.len() });
    }
    if !beats.is_strictly_increasing() {
        return Err(AnalysisError::InvalidInput(
            "beat indices must be strictly increasing".into(),
        ));
    }

    let rr = RRSeries::from_beats(beats, fs);
    let bpm = instantaneous_bpm(&rr);
    let heart_rate = HeartRateSummary {
        min_bpm: bpm.iter().copied().fold(f64::INFINITY, f64::min),
        avg_bpm: mean(&bpm),
        max_bpm: bpm.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        std_bpm: population_std(&bpm),
    };
    let hrv = hrv_time(&rr);
    Ok(RhythmStats {
        beat_count: beats.len(),
        rr,
        instantaneous_bpm: bpm,
        heart_rate,
        hrv,
    })
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    (data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64).sqrt()
}
