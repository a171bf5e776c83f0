use anyhow::{Context, Result};
use std::path::Path;

/// Parse a sample series separated by newlines, commas or whitespace.
///
/// Blank lines and lines starting with `#` are skipped. A document starting
/// with `[` is read as a JSON array of numbers instead.
pub fn parse_samples(text: &str) -> Result<Vec<f64>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let out: Vec<f64> =
            serde_json::from_str(trimmed).context("samples are not a JSON array of numbers")?;
        if out.is_empty() {
            anyhow::bail!("no numeric samples found");
        }
        return Ok(out);
    }
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for token in line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let val: f64 = token
                .parse()
                .with_context(|| format!("line {} is not f64: {}", idx + 1, token))?;
            out.push(val);
        }
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

pub fn read_samples(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_samples(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Parse newline-delimited beat sample indices.
pub fn parse_beat_indices(text: &str) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val: usize = trimmed
            .parse()
            .with_context(|| format!("line {} is not an integer index: {}", idx + 1, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no beat indices found");
    }
    Ok(out)
}

pub fn read_beat_indices(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_beat_indices(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Read one probability per window, in window order.
pub fn read_probabilities(path: &Path) -> Result<Vec<f64>> {
    let values = read_samples(path)?;
    if let Some((idx, p)) = values
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        anyhow::bail!(
            "{}: probability {} of window {} is outside [0, 1]",
            path.display(),
            p,
            idx
        );
    }
    Ok(values)
}
