use crate::buffer::Sample;
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One recorded capture, in arrival order.
#[derive(Debug, Clone)]
pub struct Trace {
    pub path: PathBuf,
    pub samples: Vec<Sample>,
}

fn is_trace_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("csv") | Some("json")
    )
}

/// Load a single trace file, or every `.csv`/`.json` file under a directory.
pub fn collect_traces(input: &Path) -> Result<Vec<Trace>> {
    if input.is_file() {
        return Ok(vec![read_trace(input)?]);
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(input) {
        let entry =
            entry.with_context(|| format!("Failed to scan directory: {}", input.display()))?;
        if entry.file_type().is_file() && is_trace_file(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    info!("Found {} trace files in {}", paths.len(), input.display());
    paths.iter().map(|path| read_trace(path)).collect()
}

pub fn read_trace(path: &Path) -> Result<Trace> {
    let samples = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => read_json_trace(path)?,
        _ => read_csv_trace(path)?,
    };
    debug!("Loaded {} samples from {}", samples.len(), path.display());
    Ok(Trace {
        path: path.to_path_buf(),
        samples,
    })
}

/// `t_offset_ms,value` rows. A header row is optional; extra columns are ignored.
pub fn read_csv_trace(path: &Path) -> Result<Vec<Sample>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // Handle variable number of fields
        .trim(csv::Trim::All)
        .from_reader(file);
    let mut samples = Vec::new();

    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let (Some(t_field), Some(value_field)) = (record.get(0), record.get(1)) else {
            anyhow::bail!("{}: row {} has fewer than two columns", path.display(), row + 1);
        };

        let t_offset_ms = match t_field.parse::<u32>() {
            Ok(t) => t,
            Err(_) if row == 0 => continue, // header
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("{}: bad t_offset_ms on row {}", path.display(), row + 1)
                })
            }
        };
        let value: f64 = value_field
            .parse()
            .with_context(|| format!("{}: bad value on row {}", path.display(), row + 1))?;

        samples.push(Sample { value, t_offset_ms });
    }

    Ok(samples)
}

/// A JSON array of `{ "value": .., "t_offset_ms": .. }` objects.
pub fn read_json_trace(path: &Path) -> Result<Vec<Sample>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let samples: Vec<Sample> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON trace: {}", path.display()))?;
    Ok(samples)
}
