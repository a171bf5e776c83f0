//! Caller-facing analysis: conditioning, beat detection, rhythm statistics
//! and episode aggregation over one recording.

use crate::{
    conditioning::condition,
    config::AnalysisConfig,
    detectors::detect_r_peaks_with_config,
    episodes::{scan_episodes, EpisodeSummary, TimedEpisode, WindowClassifier, WindowScore},
    error::{AnalysisError, AnalysisResult},
    metrics::{rhythm_statistics, RhythmStats},
    signal::Beats,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Rate of the conditioned signal every index below refers to.
    pub fs: f64,
    pub sample_count: usize,
    pub duration_s: f64,
    pub beats: Beats,
    /// `None` when fewer than two beats were found.
    pub rhythm: Option<RhythmStats>,
    pub episodes: Vec<TimedEpisode>,
    pub summary: EpisodeSummary,
    pub windows: Vec<WindowScore>,
}

/// Run every stage over `raw` sampled at `source_rate`.
///
/// The conditioned signal must hold at least one classification window.
/// Too few beats for rhythm statistics is not an error here; the report
/// carries no rhythm section instead.
pub fn analyze<C: WindowClassifier + ?Sized>(
    raw: &[f64],
    source_rate: f64,
    config: &AnalysisConfig,
    classifier: &C,
) -> AnalysisResult<AnalysisReport> {
    config.validate()?;
    let signal = condition(raw, source_rate, &config.conditioning)?;
    let fs = signal.fs();
    let plan = config.episodes.plan(fs)?;
    if signal.len() < plan.window_len() {
        return Err(AnalysisError::InsufficientSignal {
            required: plan.window_len(),
            actual: signal.len(),
        });
    }

    let beats = detect_r_peaks_with_config(&signal, &config.detector)?;
    let rhythm = match rhythm_statistics(&beats, fs) {
        Ok(stats) => Some(stats),
        Err(AnalysisError::InsufficientData { beats }) => {
            warn!("rhythm statistics unavailable: only {beats} beats detected");
            None
        }
        Err(err) => return Err(err),
    };

    let scan = scan_episodes(&signal, classifier, &config.episodes)?;
    let summary = scan.summary();
    debug!(
        "analysed {:.1} s: {} beats, {} episodes, burden {:.1}%",
        signal.duration(),
        beats.len(),
        summary.episode_count,
        summary.burden_percent
    );
    Ok(AnalysisReport {
        fs,
        sample_count: signal.len(),
        duration_s: signal.duration(),
        episodes: scan.timed_episodes(),
        beats,
        rhythm,
        summary,
        windows: scan.windows,
    })
}
