//! Level extraction from chart screenshots.
//!
//! This module provides:
//! - Image validation and base64 encoding (`encode`)
//! - The vision service seam and its HTTP client (`service`)
//! - Reply sanitizing and strict parsing (`parse`)
//! - `extract_levels`, which ties them together for one image

pub mod encode;
pub mod parse;
pub mod service;

pub use encode::{encode_image, has_supported_extension};
pub use parse::parse_reply;
pub use service::{OpenAiVisionClient, VisionService};

use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::levels::LevelLabel;

/// Instruction sent with every chart image.
pub const LEVEL_PROMPT: &str = r#"You are a skilled assistant specialized in analyzing financial chart images and extracting reference levels extended to the right side of the market profile chart. Interpret the image, identify the reference levels, and return them as a list of [key, value] pairs.
Each reference level has one of these names: "VPoC", "V-PPoC", "PoorH", "PoorL", "SwingH", "SwingL", "ABPoorH", "ABPoorL", "SingleP", "pMon-Series-H", "pMon-Series-L", "pWk-Series-H", "pWk-Series-L". VPoC and V-PPoC carry their numerical value on the chart. For the other names, read the value from the level line against the price index.
If several names mark a single line (e.g. pMon-Series-L, SwingL, PoorL), report that value once for each name.
Only consider solid yellow levels clearly extended to the right side near the price column. Ignore dotted yellow lines, the red, green and blue numbers in the price index, and any label, annotation or marking not extended to the right of the chart.
Output format:
[["VPoC", 372], ["VPoC", 360], ["PoorL", 358], ["PoorH", 379], ["SwingL", 362], ["SwingH", 381], ["ABPoorH", 383], ["ABPoorL", 364], ["SingleP", 374], ["SingleP", 412], ["pMon-Series-H", 376], ["pMon-Series-L", 356], ["pWk-Series-H", 385], ["pWk-Series-L", 366]]
Do not add any other sentences. The output must strictly follow the output format."#;

/// Extracts `(label, value)` pairs from one chart image.
///
/// Transport failures are retried up to `config.max_attempts` total attempts;
/// format and parse failures are returned immediately.
pub fn extract_levels(
    image_path: &Path,
    service: &dyn VisionService,
    config: &PipelineConfig,
) -> Result<Vec<(LevelLabel, f64)>> {
    let image = encode_image(image_path)?;

    let mut attempt = 1;
    let reply = loop {
        match service.describe(LEVEL_PROMPT, &image) {
            Ok(reply) => break reply,
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                crate::log(&format!(
                    "Attempt {}/{} for {} failed: {}. Retrying...",
                    attempt,
                    config.max_attempts,
                    image_path.display(),
                    e
                ));
                thread::sleep(Duration::from_millis(config.retry_delay_ms));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    };

    parse_reply(&reply)
}
