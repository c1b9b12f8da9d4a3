//! Batch extraction over a directory of chart images.
//!
//! Runs the extractor once per image and collects every observation into one
//! `FlatLevelTable`. A failing image is logged, recorded in the report and
//! skipped; the rest of the batch carries on.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::error_log::ErrorLog;
use crate::extract::{extract_levels, has_supported_extension, VisionService};
use crate::levels::{FlatLevelTable, LevelObservation};

/// One image that produced no observations.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub symbol: String,
    pub path: PathBuf,
    pub kind: String,
    pub message: String,
}

/// Outcome of a batch: the sorted table plus what was skipped.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub table: FlatLevelTable,
    /// Symbols whose image was extracted successfully, in processing order
    pub processed: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn image_count(&self) -> usize {
        self.processed.len() + self.failures.len()
    }
}

/// Lists chart images in `dir` (non-recursive), sorted by path.
///
/// Files without a .jpg/.jpeg/.png extension are ignored.
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PipelineError::MissingInput(format!(
            "Image directory not found: {}",
            dir.display()
        )));
    }

    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_supported_extension(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Symbol for a chart image: its file stem.
pub fn symbol_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Extracts levels from every image in `image_dir`.
///
/// Per-image failures are written to `error_log` and returned in the report.
/// Only a missing image directory (or an unexpected non-item error) aborts.
pub fn aggregate_directory(
    image_dir: &Path,
    service: &dyn VisionService,
    config: &PipelineConfig,
    error_log: &ErrorLog,
) -> Result<BatchReport> {
    let images = discover_images(image_dir)?;
    crate::log(&format!(
        "Found {} chart images in {}",
        images.len(),
        image_dir.display()
    ));

    let mut observations: Vec<LevelObservation> = Vec::new();
    let mut processed = Vec::new();
    let mut failures = Vec::new();

    for (idx, path) in images.iter().enumerate() {
        let symbol = symbol_for(path);
        crate::log(&format!(
            "[{}/{}] Extracting levels for {}",
            idx + 1,
            images.len(),
            symbol
        ));

        match extract_levels(path, service, config) {
            Ok(pairs) => {
                crate::log(&format!("{}: {} levels", symbol, pairs.len()));
                for (label, _) in pairs.iter().filter(|(label, _)| !label.is_known()) {
                    crate::log(&format!("{}: unrecognized label '{}' kept", symbol, label));
                }
                observations.extend(
                    pairs
                        .into_iter()
                        .map(|(label, value)| LevelObservation::new(symbol.clone(), label, value)),
                );
                processed.push(symbol);
            }
            Err(e) if e.is_item_level() => {
                let message = format!("Error processing {} ({}): {}", symbol, path.display(), e);
                crate::log(&message);
                error_log.record(&message);
                failures.push(ItemFailure {
                    symbol,
                    path: path.clone(),
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    let table = FlatLevelTable::from_observations(observations);
    crate::log(&format!(
        "Batch complete: {} images ok, {} failed, {} observations",
        processed.len(),
        failures.len(),
        table.len()
    ));

    Ok(BatchReport {
        table,
        processed,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::testing::{service_error, ScriptedService};
    use crate::levels::LevelLabel;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn config() -> PipelineConfig {
        PipelineConfig {
            max_attempts: 1,
            retry_delay_ms: 0,
            ..PipelineConfig::default()
        }
    }

    fn write_chart(dir: &Path, name: &str) {
        RgbImage::from_pixel(4, 4, Rgb([20, 20, 20]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempdir().unwrap();
        write_chart(dir.path(), "BPCL.png");
        write_chart(dir.path(), "ATGL.jpg");
        std::fs::write(dir.path().join("extraction_error_log.txt"), "x").unwrap();
        std::fs::write(dir.path().join("extracted_levels.csv"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let images = discover_images(dir.path()).unwrap();
        let names: Vec<String> = images.iter().map(|p| symbol_for(p)).collect();
        assert_eq!(names, vec!["ATGL", "BPCL"]);
    }

    #[test]
    fn test_missing_directory_is_global_error() {
        let dir = tempdir().unwrap();
        let service = ScriptedService::always("[]");
        let log = ErrorLog::new(dir.path().join("errors.txt"));
        let err = aggregate_directory(&dir.path().join("nope"), &service, &config(), &log)
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }

    #[test]
    fn test_one_malformed_reply_in_three_image_batch() {
        let dir = tempdir().unwrap();
        write_chart(dir.path(), "AAA.png");
        write_chart(dir.path(), "BBB.png");
        write_chart(dir.path(), "CCC.png");
        let log = ErrorLog::new(dir.path().join("errors.txt"));

        // Images are processed in sorted order: AAA, BBB, CCC.
        let service = ScriptedService::new(vec![
            Ok("[[\"VPoC\", 100], [\"VPoC\", 90]]".into()),
            Ok("not json".into()),
            Ok("```json\n[[\"PoorL\", 50]]\n```".into()),
        ]);

        let report = aggregate_directory(dir.path(), &service, &config(), &log).unwrap();

        assert_eq!(report.processed, vec!["AAA", "CCC"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].symbol, "BBB");
        assert_eq!(report.failures[0].kind, "MalformedServiceResponse");
        assert_eq!(report.image_count(), 3);

        assert_eq!(report.table.symbols(), vec!["AAA", "CCC"]);
        assert_eq!(report.table.len(), 3);

        let content = std::fs::read_to_string(log.path()).unwrap();
        let entries: Vec<&str> = content.lines().collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].contains("BBB"));
        assert!(entries[0].contains("not json"));
    }

    #[test]
    fn test_service_failure_skips_image() {
        let dir = tempdir().unwrap();
        write_chart(dir.path(), "AAA.png");
        write_chart(dir.path(), "BBB.png");
        let log = ErrorLog::new(dir.path().join("errors.txt"));
        let service = ScriptedService::new(vec![service_error(), Ok("[[\"SwingH\", 12]]".into())]);

        let report = aggregate_directory(dir.path(), &service, &config(), &log).unwrap();
        assert_eq!(report.failures[0].kind, "ServiceCallFailure");
        assert_eq!(
            report.table.rows(),
            &[LevelObservation::new("BBB", LevelLabel::SwingH, 12.0)]
        );
    }

    #[test]
    fn test_fake_image_is_unsupported_and_skipped() {
        let dir = tempdir().unwrap();
        write_chart(dir.path(), "AAA.png");
        std::fs::write(dir.path().join("BBB.jpg"), "plain text").unwrap();
        let log = ErrorLog::new(dir.path().join("errors.txt"));
        let service = ScriptedService::always("[[\"VPoC\", 1]]");

        let report = aggregate_directory(dir.path(), &service, &config(), &log).unwrap();
        assert_eq!(report.processed, vec!["AAA"]);
        assert_eq!(report.failures[0].kind, "UnsupportedFormat");
        assert_eq!(service.call_count(), 1);
    }

    #[test]
    fn test_output_sorted_regardless_of_reply_order() {
        let dir = tempdir().unwrap();
        write_chart(dir.path(), "AAA.png");
        write_chart(dir.path(), "BBB.png");
        let log = ErrorLog::new(dir.path().join("errors.txt"));
        let service = ScriptedService::new(vec![
            Ok("[[\"PoorL\", 5], [\"VPoC\", 7], [\"SwingH\", 6]]".into()),
            Ok("[[\"VPoC\", 1], [\"VPoC\", 3]]".into()),
        ]);

        let report = aggregate_directory(dir.path(), &service, &config(), &log).unwrap();
        let got: Vec<(&str, f64)> = report
            .table
            .rows()
            .iter()
            .map(|r| (r.symbol.as_str(), r.value))
            .collect();
        assert_eq!(
            got,
            vec![("AAA", 7.0), ("AAA", 6.0), ("AAA", 5.0), ("BBB", 3.0), ("BBB", 1.0)]
        );
    }
}
