//! Level labels and the flat observation table.
//!
//! A level is a named horizontal price line on a market-profile chart.
//! The vision service reports every marking it sees as a `[label, value]`
//! pair; one chart can carry the same label several times at different prices.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Chart annotation tag.
///
/// Known tags keep their exact chart spelling; anything else the service
/// returns is carried through verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum LevelLabel {
    VPoC,
    VPPoC,
    SingleP,
    PoorH,
    PoorL,
    SwingH,
    SwingL,
    ABPoorH,
    ABPoorL,
    PMonSeriesH,
    PMonSeriesL,
    PWkSeriesH,
    PWkSeriesL,
    Other(String),
}

/// Labels that become columns in the wide table, in column order.
///
/// The previous-week and previous-month series never get columns.
pub const COLUMN_LABELS: [LevelLabel; 9] = [
    LevelLabel::VPoC,
    LevelLabel::VPPoC,
    LevelLabel::SingleP,
    LevelLabel::PoorH,
    LevelLabel::PoorL,
    LevelLabel::SwingH,
    LevelLabel::SwingL,
    LevelLabel::ABPoorH,
    LevelLabel::ABPoorL,
];

/// Every label the prompt asks the service for.
pub const KNOWN_LABELS: [LevelLabel; 13] = [
    LevelLabel::VPoC,
    LevelLabel::VPPoC,
    LevelLabel::PoorH,
    LevelLabel::PoorL,
    LevelLabel::SwingH,
    LevelLabel::SwingL,
    LevelLabel::ABPoorH,
    LevelLabel::ABPoorL,
    LevelLabel::SingleP,
    LevelLabel::PMonSeriesH,
    LevelLabel::PMonSeriesL,
    LevelLabel::PWkSeriesH,
    LevelLabel::PWkSeriesL,
];

impl LevelLabel {
    pub fn as_str(&self) -> &str {
        match self {
            LevelLabel::VPoC => "VPoC",
            LevelLabel::VPPoC => "V-PPoC",
            LevelLabel::SingleP => "SingleP",
            LevelLabel::PoorH => "PoorH",
            LevelLabel::PoorL => "PoorL",
            LevelLabel::SwingH => "SwingH",
            LevelLabel::SwingL => "SwingL",
            LevelLabel::ABPoorH => "ABPoorH",
            LevelLabel::ABPoorL => "ABPoorL",
            LevelLabel::PMonSeriesH => "pMon-Series-H",
            LevelLabel::PMonSeriesL => "pMon-Series-L",
            LevelLabel::PWkSeriesH => "pWk-Series-H",
            LevelLabel::PWkSeriesL => "pWk-Series-L",
            LevelLabel::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, LevelLabel::Other(_))
    }
}

impl FromStr for LevelLabel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = KNOWN_LABELS
            .iter()
            .find(|known| known.as_str() == s)
            .cloned()
            .unwrap_or_else(|| LevelLabel::Other(s.to_string()));
        Ok(label)
    }
}

impl From<String> for LevelLabel {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(label) => label,
            Err(never) => match never {},
        }
    }
}

impl From<LevelLabel> for String {
    fn from(label: LevelLabel) -> Self {
        label.as_str().to_string()
    }
}

impl fmt::Display for LevelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected chart marking for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelObservation {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Key")]
    pub label: LevelLabel,
    #[serde(rename = "Value")]
    pub value: f64,
}

impl LevelObservation {
    pub fn new(symbol: impl Into<String>, label: LevelLabel, value: f64) -> Self {
        Self {
            symbol: symbol.into(),
            label,
            value,
        }
    }
}

/// All observations of a batch, sorted by symbol ascending then value descending.
///
/// The ordering is established on construction and never broken afterwards,
/// so consumers can take the first N values of a (symbol, label) group as
/// its N largest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatLevelTable {
    rows: Vec<LevelObservation>,
}

impl FlatLevelTable {
    pub fn from_observations(mut rows: Vec<LevelObservation>) -> Self {
        // Stable: equal (symbol, value) keep extraction order.
        rows.sort_by(|a, b| {
            a.symbol
                .cmp(&b.symbol)
                .then_with(|| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal))
        });
        Self { rows }
    }

    pub fn rows(&self) -> &[LevelObservation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct symbols in table order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            if out.last() != Some(&row.symbol.as_str()) {
                out.push(&row.symbol);
            }
        }
        out
    }
}
