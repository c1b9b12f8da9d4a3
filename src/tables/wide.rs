//! Wide level table CSV: symbol, reference passthrough columns, value columns.

use std::path::Path;

use crate::error::Result;
use crate::reshape::{value_columns, ReferenceTable, WideLevelRow};

/// Writes the merged table, replacing any previous file.
pub fn write_wide_csv(
    path: &Path,
    reference: &ReferenceTable,
    rows: &[WideLevelRow],
    rank_depth: usize,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["Symbol".to_string()];
    header.extend(reference.passthrough_headers.iter().cloned());
    header.extend(value_columns(rank_depth));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = Vec::with_capacity(header.len());
        record.push(row.symbol.clone());
        record.extend(row.passthrough.iter().cloned());
        record.extend(row.values.iter().map(|v| super::format_value(*v)));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::{FlatLevelTable, LevelLabel, LevelObservation};
    use crate::reshape::{reshape, ReferenceSymbol};
    use tempfile::tempdir;

    fn sample() -> (FlatLevelTable, ReferenceTable) {
        let table = FlatLevelTable::from_observations(vec![
            LevelObservation::new("AAA", LevelLabel::VPoC, 100.0),
            LevelObservation::new("AAA", LevelLabel::VPoC, 90.0),
            LevelObservation::new("AAA", LevelLabel::PoorL, 50.0),
            LevelObservation::new("ZZZ", LevelLabel::VPoC, 7.0),
        ]);
        let reference = ReferenceTable {
            passthrough_headers: vec!["Sector".to_string()],
            rows: vec![
                ReferenceSymbol {
                    symbol: "AAA".to_string(),
                    passthrough: vec!["Metals".to_string()],
                },
                ReferenceSymbol {
                    symbol: "BBB".to_string(),
                    passthrough: vec!["Banks, Private".to_string()],
                },
            ],
        };
        (table, reference)
    }

    #[test]
    fn test_write_wide_csv_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        let (table, reference) = sample();
        let rows = reshape(&table, &reference, 5, false);

        write_wide_csv(&path, &reference, &rows, 5).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 2 + 45);
        assert_eq!(&headers[0], "Symbol");
        assert_eq!(&headers[1], "Sector");
        assert_eq!(&headers[2], "VPoC_1");
        assert!(headers
            .iter()
            .all(|h| !h.starts_with("pWk-Series") && !h.starts_with("pMon-Series")));

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "AAA");
        assert_eq!(&records[0][2], "100.0");
        assert_eq!(&records[0][3], "90.0");
        assert_eq!(&records[0][4], "0.0");
        let poor_l_1 = headers.iter().position(|h| h == "PoorL_1").unwrap();
        assert_eq!(&records[0][poor_l_1], "50.0");

        assert_eq!(&records[1][0], "BBB");
        assert_eq!(&records[1][1], "Banks, Private");
        assert!(records[1].iter().skip(2).all(|v| v == "0.0"));
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = tempdir().unwrap();
        let (table, reference) = sample();

        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        write_wide_csv(&first, &reference, &reshape(&table, &reference, 5, false), 5).unwrap();
        write_wide_csv(&second, &reference, &reshape(&table, &reference, 5, false), 5).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    }
}
