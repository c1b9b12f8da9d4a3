//! Flat level table CSV: `Symbol,Key,Value`, one row per observation.

use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::levels::{FlatLevelTable, LevelObservation};

/// Header row of the flat CSV.
pub const FLAT_HEADER: [&str; 3] = ["Symbol", "Key", "Value"];

/// Writes the flat table, replacing any previous file.
pub fn write_flat_csv(path: &Path, table: &FlatLevelTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(FLAT_HEADER)?;
    for row in table.rows() {
        writer.write_record([
            row.symbol.as_str(),
            row.label.as_str(),
            super::format_value(row.value).as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Loads a flat table written by `write_flat_csv`.
///
/// Malformed rows are skipped with a warning; the result is re-sorted so a
/// hand-edited file still satisfies the table ordering.
pub fn read_flat_csv(path: &Path) -> Result<FlatLevelTable> {
    if !path.exists() {
        return Err(PipelineError::missing_input(path));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    for required in FLAT_HEADER {
        if !headers.iter().any(|h| h == required) {
            return Err(PipelineError::invalid_table(format!(
                "{} has no {} column",
                path.display(),
                required
            )));
        }
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<LevelObservation>().enumerate() {
        match record {
            Ok(obs) if obs.value.is_finite() => rows.push(obs),
            Ok(obs) => {
                crate::log(&format!(
                    "Warning: Skipping non-finite value for {} in row {}",
                    obs.symbol,
                    idx + 2
                ));
            }
            Err(e) => {
                crate::log(&format!(
                    "Warning: Skipping malformed CSV row {}: {}",
                    idx + 2,
                    e
                ));
            }
        }
    }

    Ok(FlatLevelTable::from_observations(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelLabel;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_write_flat_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("extracted_levels.csv");
        let table = FlatLevelTable::from_observations(vec![
            LevelObservation::new("BPCL", LevelLabel::PoorL, 290.0),
            LevelObservation::new("ATGL", LevelLabel::VPPoC, 612.35),
        ]);

        write_flat_csv(&path, &table).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec!["Symbol,Key,Value", "ATGL,V-PPoC,612.35", "BPCL,PoorL,290.0"]
        );
    }

    #[test]
    fn test_read_skips_malformed_rows() {
        let file = create_test_csv(
            "Symbol,Key,Value
AAA,VPoC,100.0
AAA,VPoC,not-a-number
BBB,pWk-Series-H,12
",
        );
        let table = read_flat_csv(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].label, LevelLabel::PWkSeriesH);
    }

    #[test]
    fn test_read_resorts_rows() {
        let file = create_test_csv(
            "Symbol,Key,Value
BBB,VPoC,1
AAA,VPoC,5
AAA,SwingH,9
",
        );
        let table = read_flat_csv(file.path()).unwrap();
        let values: Vec<f64> = table.rows().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![9.0, 5.0, 1.0]);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_flat_csv(&dir.path().join("none.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }

    #[test]
    fn test_read_rejects_wrong_header() {
        let file = create_test_csv("Ticker,Level\nAAA,1\n");
        let err = read_flat_csv(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTable(_)));
    }

    #[test]
    fn test_read_accepts_padded_header() {
        let file = create_test_csv("Symbol, Key, Value\nAAA,VPoC,100\nAAA,PoorL,50\n");
        let table = read_flat_csv(file.path()).unwrap();
        assert_eq!(
            table.rows(),
            &[
                LevelObservation::new("AAA", LevelLabel::VPoC, 100.0),
                LevelObservation::new("AAA", LevelLabel::PoorL, 50.0),
            ]
        );
    }

    #[test]
    fn test_write_then_read_preserves_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flat.csv");
        let table = FlatLevelTable::from_observations(vec![
            LevelObservation::new("AAA", LevelLabel::VPoC, 100.0),
            LevelObservation::new("AAA", LevelLabel::Other("nPoC".into()), 95.25),
        ]);
        write_flat_csv(&path, &table).unwrap();
        assert_eq!(read_flat_csv(&path).unwrap(), table);
    }
}
