//! Pivot of the flat level table into one wide row per reference symbol.
//!
//! Columns are `{Label}_{rank}` for each label in `COLUMN_LABELS` and rank
//! 1..=rank_depth. Rank 1 is the largest value seen for that symbol and label.
//! The reference list decides which rows exist and in what order.

use std::collections::HashMap;

use crate::levels::{FlatLevelTable, COLUMN_LABELS};

/// Value written when a symbol has fewer observations than ranks.
pub const DEFAULT_VALUE: f64 = 0.0;

/// One tradable symbol and the reference columns that travel with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSymbol {
    pub symbol: String,
    pub passthrough: Vec<String>,
}

/// The reference list: authoritative row set and row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    /// Headers of the non-symbol columns, in file order
    pub passthrough_headers: Vec<String>,
    pub rows: Vec<ReferenceSymbol>,
}

#[cfg(test)]
impl ReferenceTable {
    /// Builds a reference table with no passthrough columns.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passthrough_headers: Vec::new(),
            rows: symbols
                .into_iter()
                .map(|s| ReferenceSymbol {
                    symbol: s.into(),
                    passthrough: Vec::new(),
                })
                .collect(),
        }
    }
}

/// One output row. `values` is laid out like `value_columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct WideLevelRow {
    pub symbol: String,
    pub passthrough: Vec<String>,
    pub values: Vec<f64>,
}

#[cfg(test)]
impl WideLevelRow {
    /// Value for `label` at 1-based `rank`, if that column exists.
    pub fn value(
        &self,
        label: &crate::levels::LevelLabel,
        rank: usize,
        rank_depth: usize,
    ) -> Option<f64> {
        let col = COLUMN_LABELS.iter().position(|l| l == label)?;
        if rank == 0 || rank > rank_depth {
            return None;
        }
        self.values.get(col * rank_depth + rank - 1).copied()
    }
}

/// Value column names, label-major: `VPoC_1 .. VPoC_n, V-PPoC_1, ...`.
pub fn value_columns(rank_depth: usize) -> Vec<String> {
    COLUMN_LABELS
        .iter()
        .flat_map(|label| (1..=rank_depth).map(move |rank| format!("{}_{}", label, rank)))
        .collect()
}

/// Join key for a symbol. Exact unless normalization was asked for.
fn join_key(symbol: &str, normalize: bool) -> String {
    if normalize {
        symbol.trim().to_ascii_uppercase()
    } else {
        symbol.to_string()
    }
}

/// Pivots `table` onto `reference`.
///
/// Symbols missing from `table` get all-default rows; symbols missing from
/// `reference` are dropped. Labels outside `COLUMN_LABELS` are ignored.
pub fn reshape(
    table: &FlatLevelTable,
    reference: &ReferenceTable,
    rank_depth: usize,
    normalize_symbols: bool,
) -> Vec<WideLevelRow> {
    let mut groups: HashMap<(String, usize), Vec<f64>> = HashMap::new();
    for obs in table.rows() {
        let Some(col) = COLUMN_LABELS.iter().position(|l| *l == obs.label) else {
            continue;
        };
        groups
            .entry((join_key(&obs.symbol, normalize_symbols), col))
            .or_default()
            .push(obs.value);
    }

    // The table is already value-descending per symbol; sorting again only
    // matters when normalization merges differently spelled symbols.
    for values in groups.values_mut() {
        values.sort_by(|a, b| b.total_cmp(a));
        values.truncate(rank_depth);
    }

    reference
        .rows
        .iter()
        .map(|reference_row| {
            let key = join_key(&reference_row.symbol, normalize_symbols);
            let mut values = Vec::with_capacity(COLUMN_LABELS.len() * rank_depth);
            for col in 0..COLUMN_LABELS.len() {
                let observed = groups.get(&(key.clone(), col));
                for rank in 0..rank_depth {
                    let value = observed
                        .and_then(|v| v.get(rank))
                        .copied()
                        .unwrap_or(DEFAULT_VALUE);
                    values.push(value);
                }
            }
            WideLevelRow {
                symbol: reference_row.symbol.clone(),
                passthrough: reference_row.passthrough.clone(),
                values,
            }
        })
        .collect()
}
