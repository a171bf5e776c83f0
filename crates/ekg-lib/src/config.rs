use crate::{
    conditioning::ConditioningConfig, detectors::DetectorConfig, episodes::EpisodeConfig,
    error::AnalysisResult,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Configuration for a full analysis run.
///
/// Every section and field is optional in TOML; omitted values take their
/// defaults.
///
/// ```toml
/// [conditioning]
/// analysis_rate_hz = 250.0
///
/// [detector]
/// lowcut_hz = 5.0
/// highcut_hz = 15.0
///
/// [episodes]
/// window_s = 10.0
/// overlap = 0.5
/// threshold = 0.5
/// min_episode_s = 5.0
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub conditioning: ConditioningConfig,
    pub detector: DetectorConfig,
    pub episodes: EpisodeConfig,
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text).context("parsing analysis config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("loading config {}", path.display()))
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        self.conditioning.validate()?;
        self.detector.validate()?;
        self.episodes.validate()
    }
}
