//! Reference symbol list loading.
//!
//! The reference CSV names the tradable symbols that must appear in the
//! final output. Its symbol column is `Symbol`, or `Stocks` in older sheets.
//! Every other column is carried through to the output untouched.

use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::reshape::{ReferenceSymbol, ReferenceTable};

/// Accepted names for the symbol column, in order of preference.
const SYMBOL_COLUMNS: [&str; 2] = ["Symbol", "Stocks"];

/// Loads the reference list.
///
/// Fails with `MissingInput` if the file does not exist and with
/// `ReferenceDataError` if it cannot be parsed, lacks a symbol column, or
/// holds no symbols.
pub fn load_reference(path: &Path) -> Result<ReferenceTable> {
    if !path.exists() {
        return Err(PipelineError::missing_input(path));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        PipelineError::reference(format!("Cannot open {}: {}", path.display(), e))
    })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::reference(format!("Cannot read header: {}", e)))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let symbol_idx = SYMBOL_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name))
        .ok_or_else(|| {
            PipelineError::reference(format!(
                "{} has no Symbol or Stocks column (found: {})",
                path.display(),
                headers.join(", ")
            ))
        })?;

    if headers[symbol_idx] != "Symbol" {
        crate::log(&format!(
            "Reference column '{}' renamed to 'Symbol'",
            headers[symbol_idx]
        ));
    }

    let passthrough_headers: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != symbol_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            PipelineError::reference(format!("Bad row {} in {}: {}", line + 2, path.display(), e))
        })?;

        let symbol = record.get(symbol_idx).unwrap_or_default();
        if symbol.is_empty() {
            crate::log(&format!(
                "Warning: Skipping reference row {} with empty symbol",
                line + 2
            ));
            continue;
        }

        let passthrough = record
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != symbol_idx)
            .map(|(_, field)| field.to_string())
            .collect();

        rows.push(ReferenceSymbol {
            symbol: symbol.to_string(),
            passthrough,
        });
    }

    if rows.is_empty() {
        return Err(PipelineError::reference(format!(
            "{} contains no symbols",
            path.display()
        )));
    }

    crate::log(&format!("Loaded {} reference symbols", rows.len()));

    Ok(ReferenceTable {
        passthrough_headers,
        rows,
    })
}
