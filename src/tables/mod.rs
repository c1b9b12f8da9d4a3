//! Reading and writing the pipeline's tables.
//!
//! This module provides:
//! - Flat level table CSV (write after extraction, read back for reshape-only runs)
//! - Reference symbol CSV loading
//! - Wide level table CSV output
//! - JSON export of the batch report

pub mod flat;
pub mod reference;
pub mod report;
pub mod wide;

pub use flat::{read_flat_csv, write_flat_csv};
pub use reference::load_reference;
pub use report::export_report;
pub use wide::write_wide_csv;

/// Formats a level value for CSV output. Whole numbers keep one decimal
/// (`100.0`), everything else prints in shortest round-trip form.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(372.0), "372.0");
        assert_eq!(format_value(372.5), "372.5");
        assert_eq!(format_value(1234.05), "1234.05");
        assert_eq!(format_value(-3.0), "-3.0");
    }
}
