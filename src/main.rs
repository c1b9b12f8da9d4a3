//! Chart Levels
//!
//! Reads named price levels off market-profile chart screenshots with a
//! vision model, then pivots them onto a reference list of tradable symbols.

mod aggregate;
mod config;
mod error;
mod error_log;
mod extract;
mod levels;
mod paths;
mod pipeline;
mod reshape;
mod tables;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use config::PipelineConfig;
use error_log::ErrorLog;
use extract::OpenAiVisionClient;
use paths::SessionPaths;

const LOG_FILE_NAME: &str = "chart_levels.log";

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Extract,
    Reshape,
    Run,
    Help,
}

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    image_dir: Option<String>,
    reference: Option<PathBuf>,
    flat: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<(Command, CliArgs)> {
    let command = match args.first().map(String::as_str) {
        Some("extract") => Command::Extract,
        Some("reshape") => Command::Reshape,
        Some("run") => Command::Run,
        Some("help") | Some("--help") | Some("-h") | None => return Ok((Command::Help, CliArgs::default())),
        Some(other) => bail!("Unknown command: {}", other),
    };

    let mut cli = CliArgs::default();
    let mut iter = args[1..].iter();
    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} requires a value", flag))
        };
        match flag.as_str() {
            "--image-dir" | "--image_dir" => cli.image_dir = Some(value()?),
            "--reference" => cli.reference = Some(PathBuf::from(value()?)),
            "--flat" => cli.flat = Some(PathBuf::from(value()?)),
            "--config" => cli.config = Some(PathBuf::from(value()?)),
            other => bail!("Unknown argument: {}", other),
        }
    }

    if cli.image_dir.is_none() {
        bail!("--image-dir is required");
    }
    if matches!(command, Command::Reshape | Command::Run) && cli.reference.is_none() {
        bail!("--reference is required");
    }
    if cli.flat.is_some() && command != Command::Reshape {
        bail!("--flat is only valid with reshape");
    }

    Ok((command, cli))
}

fn print_usage() {
    println!("Usage:");
    println!("  chart-levels extract --image-dir <DIR> [--config <FILE>]");
    println!("  chart-levels reshape --image-dir <DIR> --reference <CSV> [--flat <CSV>] [--config <FILE>]");
    println!("  chart-levels run     --image-dir <DIR> --reference <CSV> [--config <FILE>]");
    println!("  chart-levels help");
    println!();
    println!("<DIR> is resolved against data_dir from config.json.");
    println!("The API key is read from the environment (OPENAI_API_KEY by default, .env supported).");
}

fn reference_path(cli: &CliArgs) -> error::Result<&Path> {
    cli.reference
        .as_deref()
        .ok_or_else(|| error::PipelineError::config("--reference is required"))
}

fn execute(
    command: Command,
    cli: &CliArgs,
    config: &PipelineConfig,
    session: &SessionPaths,
    error_log: &ErrorLog,
) -> error::Result<()> {
    match command {
        Command::Extract => {
            let client = OpenAiVisionClient::from_config(config)?;
            pipeline::extract_stage(session, &client, config, error_log)?;
        }
        Command::Reshape => {
            let reference = tables::load_reference(reference_path(cli)?)?;
            let flat_path = cli.flat.as_deref().unwrap_or(&session.flat_csv);
            let table = tables::read_flat_csv(flat_path)?;
            pipeline::reshape_stage(session, &table, &reference, config)?;
        }
        Command::Run => {
            let client = OpenAiVisionClient::from_config(config)?;
            pipeline::run_stage(session, &client, reference_path(cli)?, config, error_log)?;
        }
        Command::Help => print_usage(),
    }
    Ok(())
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(paths::get_logs_dir().join(LOG_FILE_NAME))
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));

    paths::ensure_directories().context("Failed to create logs directory")?;
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, cli) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            return Err(e);
        }
    };
    if command == Command::Help {
        print_usage();
        return Ok(());
    }

    let config = PipelineConfig::load(cli.config.as_deref())?;
    let image_dir = config.image_dir(cli.image_dir.as_deref().unwrap_or_default());
    let session = SessionPaths::new(&image_dir, &config);
    let error_log = ErrorLog::new(&session.error_log);

    log(&format!("Session directory: {}", session.image_dir.display()));

    match execute(command, &cli, &config, &session, &error_log) {
        Ok(()) => {
            log("Done");
            Ok(())
        }
        Err(e) => {
            log(&format!("Run aborted ({}): {}", e.kind(), e));
            error_log.record(&format!("Run aborted: {}", e));
            Err(e.into())
        }
    }
}
