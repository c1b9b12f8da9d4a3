//! JSON export of a batch report.

use chrono::Local;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::aggregate::{BatchReport, ItemFailure};
use crate::error::Result;

#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    generated_at: String,
    image_dir: &'a Path,
    images: usize,
    observations: usize,
    processed: &'a [String],
    failures: &'a [ItemFailure],
}

/// Export a batch report to a JSON file.
///
/// The output is pretty-printed for human readability.
pub fn export_report(report: &BatchReport, image_dir: &Path, output_path: &Path) -> Result<()> {
    let file = ReportFile {
        generated_at: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        image_dir,
        images: report.image_count(),
        observations: report.table.len(),
        processed: &report.processed,
        failures: &report.failures,
    };
    let json = serde_json::to_string_pretty(&file)?;

    let mut out = File::create(output_path)?;
    out.write_all(json.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::{FlatLevelTable, LevelLabel, LevelObservation};
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_export_report() {
        let report = BatchReport {
            table: FlatLevelTable::from_observations(vec![LevelObservation::new(
                "AAA",
                LevelLabel::VPoC,
                100.0,
            )]),
            processed: vec!["AAA".to_string()],
            failures: vec![ItemFailure {
                symbol: "BBB".to_string(),
                path: PathBuf::from("data/BBB.png"),
                kind: "MalformedServiceResponse".to_string(),
                message: "not JSON".to_string(),
            }],
        };

        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        export_report(&report, Path::new("data"), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["images"], 2);
        assert_eq!(value["observations"], 1);
        assert_eq!(value["processed"][0], "AAA");
        assert_eq!(value["failures"][0]["symbol"], "BBB");
        assert_eq!(value["failures"][0]["kind"], "MalformedServiceResponse");
    }
}
