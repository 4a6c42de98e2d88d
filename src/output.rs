use crate::error::FailureKind;
use crate::thermal::CalibrationRequest;
use crate::MeasurementResult;
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::path::Path;

/// Outcome of replaying one trace.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub recorded_at: DateTime<Utc>,
    pub source: String,
    pub profile: String,
    pub sample_count: usize,
    pub result: Option<MeasurementResult>,
    pub failure: Option<FailureKind>,
    /// Human-readable reason when the failure alone is ambiguous.
    pub detail: Option<String>,
    pub calibration: Option<CalibrationRequest>,
}

fn prepare_path(base_path: &str) -> Result<&Path> {
    let path = Path::new(base_path);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        // Create directory if it doesn't exist
        std::fs::create_dir_all(dir)?;
    }
    Ok(path)
}

pub fn write_reports_to_csv(base_path: &str, reports: &[Report]) -> Result<()> {
    let path = prepare_path(base_path)?;
    info!("Writing {} reports to {}", reports.len(), path.display());
    let file = std::fs::File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record([
        "recorded_at",
        "source",
        "profile",
        "sample_count",
        "rate",
        "variability",
        "confidence",
        "failure",
        "detail",
    ])?;

    for report in reports {
        let result = report.result.as_ref();
        writer.write_record(&[
            report.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            report.source.clone(),
            report.profile.clone(),
            report.sample_count.to_string(),
            result.map(|r| r.rate.to_string()).unwrap_or_default(),
            result
                .and_then(|r| r.variability)
                .map(|v| v.to_string())
                .unwrap_or_default(),
            result
                .map(|r| format!("{:.2}", r.confidence))
                .unwrap_or_default(),
            report.failure.map(|f| format!("{:?}", f)).unwrap_or_default(),
            report.detail.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_reports_to_json(base_path: &str, reports: &[Report]) -> Result<()> {
    let path = prepare_path(base_path)?;
    info!("Writing {} reports to {}", reports.len(), path.display());
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, reports)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reports() -> Vec<Report> {
        let recorded_at = Utc::now();
        vec![
            Report {
                recorded_at,
                source: "a.csv".to_string(),
                profile: "pulse".to_string(),
                sample_count: 900,
                result: Some(MeasurementResult {
                    rate: 72.0,
                    variability: Some(12.0),
                    confidence: 0.95,
                    sample_count: 900,
                }),
                failure: None,
                detail: None,
                calibration: None,
            },
            Report {
                recorded_at,
                source: "b.csv".to_string(),
                profile: "pulse".to_string(),
                sample_count: 100,
                result: None,
                failure: Some(FailureKind::Cancelled),
                detail: Some("too early: 4000 ms".to_string()),
                calibration: None,
            },
        ]
    }

    #[test]
    fn csv_report_has_one_row_per_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.csv");
        write_reports_to_csv(path.to_str().unwrap(), &reports()).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][4], "72");
        assert_eq!(&rows[0][6], "0.95");
        assert_eq!(&rows[1][7], "Cancelled");
        assert_eq!(&rows[1][8], "too early: 4000 ms");
        assert_eq!(&rows[0][8], "");
    }

    #[test]
    fn json_report_serializes_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        write_reports_to_json(path.to_str().unwrap(), &reports()).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["result"]["rate"], 72.0);
        assert!(parsed[1]["result"].is_null());
        assert!(!parsed[1]["failure"].is_null());
        assert_eq!(parsed[1]["detail"], "too early: 4000 ms");
    }
}
