use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::Path;

/// Read one numeric column of a delimited file with a header row.
///
/// The column is matched case-insensitively. Empty cells are an error; the
/// caller gets the 1-based data row in the message.
pub fn read_csv_column(path: &Path, column: &str, delimiter: u8) -> Result<Vec<f64>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let headers = reader.headers().context("reading header")?.clone();
    let idx = locate_column(&headers, column)?;

    let mut out = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.context("reading record")?;
        let cell = record
            .get(idx)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow::anyhow!("row {} has no value for {}", row + 1, column))?;
        let val: f64 = cell
            .parse()
            .with_context(|| format!("row {} {} is not f64: {}", row + 1, column, cell))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("{} has no data rows", path.display());
    }
    Ok(out)
}

fn locate_column(headers: &StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "missing column {} (have: {})",
                requested,
                headers.iter().collect::<Vec<_>>().join(", ")
            )
        })
}
