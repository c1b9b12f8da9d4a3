//! Stage orchestration for the CLI commands.
//!
//! Each stage takes its collaborators explicitly so the whole flow can run
//! against a scripted vision service in tests.

use std::collections::HashSet;
use std::path::Path;

use crate::aggregate::{aggregate_directory, BatchReport};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::error_log::ErrorLog;
use crate::extract::VisionService;
use crate::levels::FlatLevelTable;
use crate::paths::SessionPaths;
use crate::reshape::{reshape, ReferenceTable};
use crate::tables::{export_report, load_reference, write_flat_csv, write_wide_csv};

/// Extracts every image in the session directory and persists the flat
/// table and the batch report.
pub fn extract_stage(
    session: &SessionPaths,
    service: &dyn VisionService,
    config: &PipelineConfig,
    error_log: &ErrorLog,
) -> Result<BatchReport> {
    let report = aggregate_directory(&session.image_dir, service, config, error_log)?;

    if report.table.is_empty() {
        crate::log("No levels extracted; flat table will contain only the header");
    }
    write_flat_csv(&session.flat_csv, &report.table)?;
    crate::log(&format!("Flat levels saved: {}", session.flat_csv.display()));

    export_report(&report, &session.image_dir, &session.report_json)?;
    crate::log(&format!("Batch report saved: {}", session.report_json.display()));

    if !report.failures.is_empty() {
        crate::log(&format!(
            "{} of {} images failed. Check {} for details.",
            report.failures.len(),
            report.image_count(),
            error_log.path().display()
        ));
    }

    Ok(report)
}

/// Pivots the flat table onto the reference list and writes the merged CSV.
///
/// Returns the number of rows written.
pub fn reshape_stage(
    session: &SessionPaths,
    table: &FlatLevelTable,
    reference: &ReferenceTable,
    config: &PipelineConfig,
) -> Result<usize> {
    let rows = reshape(table, reference, config.rank_depth, config.normalize_symbols);

    let listed: HashSet<&str> = reference.rows.iter().map(|r| r.symbol.as_str()).collect();
    let dropped: Vec<&str> = table
        .symbols()
        .into_iter()
        .filter(|s| !listed.contains(s))
        .collect();
    if !dropped.is_empty() && !config.normalize_symbols {
        crate::log(&format!(
            "{} extracted symbols not in reference list: {}",
            dropped.len(),
            dropped.join(", ")
        ));
    }

    write_wide_csv(&session.merged_csv, reference, &rows, config.rank_depth)?;
    crate::log(&format!(
        "Merged levels saved: {} ({} rows)",
        session.merged_csv.display(),
        rows.len()
    ));

    Ok(rows.len())
}

/// Full extract-then-reshape run.
///
/// The reference list is loaded first: if it is missing or invalid the run
/// aborts before any image reaches the service and nothing is written.
pub fn run_stage(
    session: &SessionPaths,
    service: &dyn VisionService,
    reference_path: &Path,
    config: &PipelineConfig,
    error_log: &ErrorLog,
) -> Result<usize> {
    let reference = load_reference(reference_path)?;
    let report = extract_stage(session, service, config, error_log)?;
    reshape_stage(session, &report.table, &reference, config)
}
