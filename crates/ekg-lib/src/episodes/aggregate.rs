use super::{
    classifier::WindowClassifier,
    window::{Window, WindowPlan},
};
use crate::{
    error::{AnalysisError, AnalysisResult},
    signal::Signal,
};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Classification window length (seconds).
    pub window_s: f64,
    /// Fraction of each window shared with the next, in `[0, 1)`.
    pub overlap: f64,
    /// Minimum probability for a window to count as positive.
    pub threshold: f64,
    /// Shortest episode that is reported (seconds).
    pub min_episode_s: f64,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            window_s: 10.0,
            overlap: 0.5,
            threshold: 0.5,
            min_episode_s: 5.0,
        }
    }
}

impl EpisodeConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if !(self.window_s.is_finite() && self.window_s > 0.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "episodes.window_s must be positive, got {}",
                self.window_s
            )));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(AnalysisError::InvalidParameter(format!(
                "episodes.overlap must lie in [0, 1), got {}",
                self.overlap
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(AnalysisError::InvalidParameter(format!(
                "episodes.threshold must lie in [0, 1], got {}",
                self.threshold
            )));
        }
        if !(self.min_episode_s.is_finite() && self.min_episode_s >= 0.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "episodes.min_episode_s must not be negative, got {}",
                self.min_episode_s
            )));
        }
        Ok(())
    }

    pub fn plan(&self, fs: f64) -> AnalysisResult<WindowPlan> {
        WindowPlan::new(fs, self.window_s, self.overlap)
    }
}

/// Classifier output for one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowScore {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub probability: f64,
}

/// A merged run of positive windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub start_sample: usize,
    pub end_sample: usize,
    /// Mean probability of the constituent windows.
    pub confidence: f64,
    pub window_count: usize,
}

impl Episode {
    pub fn duration_samples(&self) -> usize {
        self.end_sample - self.start_sample
    }

    pub fn timed(&self, fs: f64) -> TimedEpisode {
        TimedEpisode {
            start_s: self.start_sample as f64 / fs,
            end_s: self.end_sample as f64 / fs,
            duration_s: self.duration_samples() as f64 / fs,
            confidence: self.confidence,
        }
    }
}

/// Episode bounds in seconds, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedEpisode {
    pub start_s: f64,
    pub end_s: f64,
    pub duration_s: f64,
    pub confidence: f64,
}

struct OpenEpisode {
    start: usize,
    end: usize,
    probabilities: Vec<f64>,
}

impl OpenEpisode {
    fn open(score: &WindowScore) -> Self {
        Self {
            start: score.start,
            end: score.end,
            probabilities: vec![score.probability],
        }
    }

    fn extend(&mut self, score: &WindowScore) {
        self.end = score.end;
        self.probabilities.push(score.probability);
    }

    /// Accept the run when its own span, first window start to last window
    /// end, reaches `min_samples`. The reported start is then moved up to
    /// `floor` so emitted episodes never overlap.
    fn close(self, min_samples: f64, floor: usize) -> Option<Episode> {
        let duration = self.end - self.start;
        if (duration as f64) < min_samples {
            debug!(
                "dropping run {}..{} ({} windows): shorter than {min_samples} samples",
                self.start,
                self.end,
                self.probabilities.len()
            );
            return None;
        }
        let confidence = self.probabilities.iter().sum::<f64>() / self.probabilities.len() as f64;
        Some(Episode {
            start_sample: self.start.max(floor),
            end_sample: self.end,
            confidence,
            window_count: self.probabilities.len(),
        })
    }
}

/// Run-length merge of window scores, consumed strictly in order.
///
/// A score at or above `threshold` opens or extends the current run; a score
/// below it closes the run. Runs, including one still open after the last
/// window, are kept only when they span at least `min_samples`. An accepted
/// episode's start is clamped to the end of the previously emitted one.
pub fn merge_windows(scores: &[WindowScore], threshold: f64, min_samples: f64) -> Vec<Episode> {
    let mut episodes: Vec<Episode> = Vec::new();
    let mut open: Option<OpenEpisode> = None;
    for score in scores {
        if score.probability >= threshold {
            match open.as_mut() {
                Some(run) => run.extend(score),
                None => open = Some(OpenEpisode::open(score)),
            }
        } else if let Some(run) = open.take() {
            let floor = episodes.last().map_or(0, |e| e.end_sample);
            episodes.extend(run.close(min_samples, floor));
        }
    }
    if let Some(run) = open.take() {
        let floor = episodes.last().map_or(0, |e| e.end_sample);
        episodes.extend(run.close(min_samples, floor));
    }
    episodes
}

/// Summary of how much of the analysed signal is covered by episodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub detected: bool,
    pub episode_count: usize,
    pub total_s: f64,
    pub episode_s: f64,
    pub normal_rhythm_s: f64,
    pub burden_percent: f64,
}

/// Every window score together with the episodes merged from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeScan {
    pub fs: f64,
    pub sample_count: usize,
    pub windows: Vec<WindowScore>,
    pub episodes: Vec<Episode>,
}

impl EpisodeScan {
    pub fn timed_episodes(&self) -> Vec<TimedEpisode> {
        self.episodes.iter().map(|e| e.timed(self.fs)).collect()
    }

    pub fn summary(&self) -> EpisodeSummary {
        let total_s = self.sample_count as f64 / self.fs;
        let episode_s = self
            .episodes
            .iter()
            .map(|e| e.duration_samples() as f64 / self.fs)
            .sum::<f64>();
        let burden_percent = if total_s > 0.0 {
            100.0 * episode_s / total_s
        } else {
            0.0
        };
        EpisodeSummary {
            detected: !self.episodes.is_empty(),
            episode_count: self.episodes.len(),
            total_s,
            episode_s,
            normal_rhythm_s: total_s - episode_s,
            burden_percent,
        }
    }
}

fn score_window<C: WindowClassifier + ?Sized>(
    classifier: &C,
    window: &Window<'_>,
) -> AnalysisResult<WindowScore> {
    let probability = classifier.classify(window)?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(AnalysisError::Classifier {
            index: window.index,
            reason: format!("probability {probability} outside [0, 1]"),
        });
    }
    Ok(WindowScore {
        index: window.index,
        start: window.start,
        end: window.end,
        probability,
    })
}

/// Classify every window of `signal` left to right and merge the results.
pub fn scan_episodes<C: WindowClassifier + ?Sized>(
    signal: &Signal,
    classifier: &C,
    config: &EpisodeConfig,
) -> AnalysisResult<EpisodeScan> {
    config.validate()?;
    let fs = signal.fs();
    let plan = config.plan(fs)?;
    if signal.len() < plan.window_len() {
        return Err(AnalysisError::InsufficientSignal {
            required: plan.window_len(),
            actual: signal.len(),
        });
    }
    let windows = plan
        .windows(signal)
        .map(|window| score_window(classifier, &window))
        .collect::<AnalysisResult<Vec<_>>>()?;
    let episodes = merge_windows(&windows, config.threshold, config.min_episode_s * fs);
    debug!(
        "{} windows of {} samples (step {}), {} episodes",
        windows.len(),
        plan.window_len(),
        plan.step(),
        episodes.len()
    );
    Ok(EpisodeScan {
        fs,
        sample_count: signal.len(),
        windows,
        episodes,
    })
}

/// Episodes of `signal` under `config`, in ascending start order.
pub fn aggregate<C: WindowClassifier + ?Sized>(
    signal: &Signal,
    classifier: &C,
    config: &EpisodeConfig,
) -> AnalysisResult<Vec<Episode>> {
    scan_episodes(signal, classifier, config).map(|scan| scan.episodes)
}

/// Episode aggregator bound to one classifier for its whole lifetime.
#[derive(Debug, Clone)]
pub struct EpisodeAggregator<C> {
    classifier: C,
    config: EpisodeConfig,
}

impl<C: WindowClassifier> EpisodeAggregator<C> {
    pub fn new(classifier: C, config: EpisodeConfig) -> AnalysisResult<Self> {
        config.validate()?;
        Ok(Self { classifier, config })
    }

    pub fn config(&self) -> &EpisodeConfig {
        &self.config
    }

    pub fn scan(&self, signal: &Signal) -> AnalysisResult<EpisodeScan> {
        scan_episodes(signal, &self.classifier, &self.config)
    }

    pub fn aggregate(&self, signal: &Signal) -> AnalysisResult<Vec<Episode>> {
        aggregate(signal, &self.classifier, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episodes::classifier::{classifier_fn, PrecomputedProbabilities};

    fn score(index: usize, start: usize, end: usize, probability: f64) -> WindowScore {
        WindowScore {
            index,
            start,
            end,
            probability,
        }
    }

    fn scores(probabilities: &[f64], len: usize, step: usize) -> Vec<WindowScore> {
        probabilities
            .iter()
            .enumerate()
            .map(|(i, &p)| score(i, i * step, i * step + len, p))
            .collect()
    }

    #[test]
    fn thirty_second_scenario_yields_one_bracketing_episode() {
        let fs = 250.0;
        let signal = Signal::new(fs, vec![0.0; 7500]).unwrap();
        let stub = classifier_fn(|w: &Window<'_>| {
            let center = (w.start + w.end) / 2;
            if (5000..=7500).contains(&center) {
                0.9
            } else {
                0.1
            }
        });
        let scan = scan_episodes(&signal, &stub, &EpisodeConfig::default()).unwrap();
        assert_eq!(scan.windows.len(), 5);
        assert_eq!(scan.episodes.len(), 1);
        let episode = &scan.episodes[0];
        let step = 1250;
        assert!(episode.start_sample <= 5000 && episode.start_sample + step >= 5000);
        assert!(episode.end_sample >= 7500 - step && episode.end_sample <= 7500);
        assert!((episode.confidence - 0.9).abs() < 1e-12);
        assert!(episode.duration_samples() as f64 >= 5.0 * fs);
    }

    #[test]
    fn single_window_shorter_than_minimum_gives_no_episode() {
        let signal = Signal::new(250.0, vec![0.0; 2500]).unwrap();
        let config = EpisodeConfig {
            min_episode_s: 15.0,
            ..EpisodeConfig::default()
        };
        let scan = scan_episodes(&signal, &classifier_fn(|_: &Window<'_>| 0.9), &config).unwrap();
        assert_eq!(scan.windows.len(), 1);
        assert!(scan.episodes.is_empty());
    }

    #[test]
    fn signal_shorter_than_a_window_is_rejected() {
        let signal = Signal::new(250.0, vec![0.0; 2499]).unwrap();
        let always = classifier_fn(|_: &Window<'_>| 0.9);
        let err = aggregate(&signal, &always, &EpisodeConfig::default());
        assert_eq!(
            err,
            Err(AnalysisError::InsufficientSignal {
                required: 2500,
                actual: 2499
            })
        );
    }

    #[test]
    fn reruns_are_identical() {
        let signal = Signal::new(
            250.0,
            (0..20_000).map(|i| ((i as f64) * 0.013).sin()).collect(),
        )
        .unwrap();
        let classifier = classifier_fn(|w: &Window<'_>| {
            (w.samples.iter().sum::<f64>() / w.len() as f64).abs().min(1.0) * 4.0 % 1.0
        });
        let aggregator = EpisodeAggregator::new(classifier, EpisodeConfig::default()).unwrap();
        let first = aggregator.scan(&signal).unwrap();
        let second = aggregator.scan(&signal).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn short_runs_are_dropped_and_trailing_run_is_kept() {
        // len 4, step 2: a lone positive spans 4 samples, a pair spans 6.
        let windows = scores(&[0.9, 0.2, 0.6, 0.7, 0.1, 0.5, 0.8, 0.95], 4, 2);
        let episodes = merge_windows(&windows, 0.5, 6.0);
        assert_eq!(episodes.len(), 2);
        assert_eq!((episodes[0].start_sample, episodes[0].end_sample), (4, 10));
        assert_eq!(episodes[0].window_count, 2);
        assert!((episodes[0].confidence - 0.65).abs() < 1e-12);
        assert_eq!((episodes[1].start_sample, episodes[1].end_sample), (10, 18));
        assert_eq!(episodes[1].window_count, 3);
        assert!((episodes[1].confidence - (0.5 + 0.8 + 0.95) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn emitted_episodes_respect_duration_and_threshold() {
        let probabilities = [0.7, 0.5, 0.2, 0.9, 0.4, 0.8, 0.8, 0.8, 0.3, 0.6];
        let windows = scores(&probabilities, 10, 5);
        for &(threshold, min_samples) in &[(0.5, 10.0), (0.6, 15.0), (0.8, 20.0), (0.3, 0.0)] {
            let episodes = merge_windows(&windows, threshold, min_samples);
            for episode in &episodes {
                assert!(episode.duration_samples() as f64 >= min_samples);
                assert!(episode.confidence >= threshold);
            }
            for pair in episodes.windows(2) {
                assert!(pair[0].end_sample <= pair[1].start_sample);
            }
        }
    }

    #[test]
    fn high_overlap_runs_do_not_overlap() {
        // len 8, step 2: runs at windows 0-1 and 3-4 would share samples.
        let windows = scores(&[0.9, 0.9, 0.1, 0.9, 0.9], 8, 2);
        let episodes = merge_windows(&windows, 0.5, 0.0);
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].end_sample, 10);
        assert_eq!(episodes[1].start_sample, 10);
        assert_eq!(episodes[1].end_sample, 16);
    }

    #[test]
    fn minimum_duration_uses_the_unclamped_run() {
        // Run B spans windows [6, 16): ten samples, reported from 10.
        let windows = scores(&[0.9, 0.9, 0.1, 0.9, 0.9], 8, 2);
        let episodes = merge_windows(&windows, 0.5, 10.0);
        assert_eq!(episodes.len(), 2);
        assert_eq!((episodes[0].start_sample, episodes[0].end_sample), (0, 10));
        assert_eq!((episodes[1].start_sample, episodes[1].end_sample), (10, 16));
        assert_eq!(episodes[1].window_count, 2);
    }

    #[test]
    fn dense_overlap_keeps_every_qualifying_run() {
        let signal = Signal::new(250.0, vec![0.0; 7500]).unwrap();
        let mut probabilities = vec![0.9; 21];
        probabilities[5] = 0.1;
        let config = EpisodeConfig {
            overlap: 0.9,
            min_episode_s: 10.0,
            ..EpisodeConfig::default()
        };
        let scan = scan_episodes(&signal, &PrecomputedProbabilities::new(probabilities), &config)
            .unwrap();
        assert_eq!(scan.windows.len(), 21);
        assert_eq!(scan.episodes.len(), 2);
        assert_eq!((scan.episodes[0].start_sample, scan.episodes[0].end_sample), (0, 3500));
        assert_eq!(scan.episodes[1].window_count, 15);
        assert_eq!((scan.episodes[1].start_sample, scan.episodes[1].end_sample), (3500, 7500));
    }

    #[test]
    fn probability_out_of_range_is_a_classifier_error() {
        let signal = Signal::new(250.0, vec![0.0; 5000]).unwrap();
        let err = aggregate(
            &signal,
            &classifier_fn(|w: &Window<'_>| if w.index == 1 { 1.5 } else { 0.2 }),
            &EpisodeConfig::default(),
        );
        assert!(matches!(err, Err(AnalysisError::Classifier { index: 1, .. })));
        let err = aggregate(
            &signal,
            &classifier_fn(|_: &Window<'_>| f64::NAN),
            &EpisodeConfig::default(),
        );
        assert!(matches!(err, Err(AnalysisError::Classifier { index: 0, .. })));
    }

    #[test]
    fn precomputed_probabilities_drive_the_merge() {
        let signal = Signal::new(250.0, vec![0.0; 7500]).unwrap();
        let probs = PrecomputedProbabilities::new(vec![0.1, 0.2, 0.6, 0.7, 0.8]);
        let aggregator = EpisodeAggregator::new(probs, EpisodeConfig::default()).unwrap();
        let scan = aggregator.scan(&signal).unwrap();
        assert_eq!(scan.episodes.len(), 1);
        assert_eq!(scan.episodes[0].start_sample, 2500);
        assert_eq!(scan.episodes[0].end_sample, 7500);

        let summary = scan.summary();
        assert!(summary.detected);
        assert_eq!(summary.episode_count, 1);
        assert!((summary.total_s - 30.0).abs() < 1e-12);
        assert!((summary.episode_s - 20.0).abs() < 1e-12);
        assert!((summary.normal_rhythm_s - 10.0).abs() < 1e-12);
        assert!((summary.burden_percent - 200.0 / 3.0).abs() < 1e-9);

        let timed = scan.timed_episodes();
        assert_eq!(timed[0].start_s, 10.0);
        assert_eq!(timed[0].duration_s, 20.0);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = EpisodeConfig {
            threshold: 1.2,
            ..EpisodeConfig::default()
        };
        assert!(matches!(
            EpisodeAggregator::new(PrecomputedProbabilities::default(), config),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }
}
