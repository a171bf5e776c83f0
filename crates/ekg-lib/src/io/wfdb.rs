use super::RawRecording;
use crate::conditioning::DEFAULT_ANALYSIS_RATE_HZ;
use anyhow::Result;
use log::{debug, warn};
use std::path::Path;

/// Load one lead of a WFDB record (header plus signal file) in physical units.
pub fn load_wfdb_lead(header_path: &Path, lead: usize) -> Result<RawRecording> {
    if !header_path.is_file() {
        anyhow::bail!("WFDB header {} does not exist", header_path.display());
    }
    let (header, signals) = wfdb_rust::parse_wfdb(header_path);
    if lead >= signals.len() || lead >= header.signal_specs.len() {
        anyhow::bail!(
            "WFDB record contains {} signals, but lead {} was requested",
            signals.len(),
            lead
        );
    }
    let spec = &header.signal_specs[lead];
    let gain = spec.adc_gain.unwrap_or(1.0) as f64;
    let baseline = spec.baseline.or(spec.adc_zero).unwrap_or(0) as f64;
    let fs = match header.record.sampling_frequency {
        Some(f) => f as f64,
        None => {
            warn!(
                "{} has no sampling frequency, assuming {DEFAULT_ANALYSIS_RATE_HZ} Hz",
                header_path.display()
            );
            DEFAULT_ANALYSIS_RATE_HZ
        }
    };
    let samples = adc_to_physical(
        signals[lead].iter().map(|&sample| sample as f64),
        gain,
        baseline,
    );
    debug!(
        "loaded lead {lead} of {}: {} samples at {fs} Hz",
        header_path.display(),
        samples.len()
    );
    Ok(RawRecording { fs, samples })
}

/// `(adc - baseline) / gain`; a zero gain is treated as unity.
pub fn adc_to_physical(adc: impl IntoIterator<Item = f64>, gain: f64, baseline: f64) -> Vec<f64> {
    let gain = if gain == 0.0 { 1.0 } else { gain };
    adc.into_iter().map(|v| (v - baseline) / gain).collect()
}
