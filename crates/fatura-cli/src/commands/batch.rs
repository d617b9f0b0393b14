//! Batch processing command for multiple invoice images.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use fatura_core::{ExtractionResult, InvoiceEngine};

use super::config::load_config;
use super::is_supported_image;
use super::process::{format_result, EngineArgs, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching invoice images
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    result: Option<ExtractionResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = args.engine.apply(load_config(config_path)?);

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported_image(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    // One engine for the whole batch; the backend is built once here.
    let engine = Arc::new(InvoiceEngine::new(config));
    let capabilities = engine.initialize()?;
    let jobs = if capabilities.concurrent { args.jobs.max(1) } else { 1 };
    debug!("Running with {} workers ({:?})", jobs, capabilities);

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut outcomes = stream::iter(files)
        .map(|path| {
            let engine = Arc::clone(&engine);
            tokio::task::spawn_blocking(move || {
                let file_start = Instant::now();
                let outcome = engine.process_invoice(&path);
                (path, outcome, file_start.elapsed().as_millis() as u64)
            })
        })
        .buffered(jobs);

    let mut results = Vec::new();

    while let Some(joined) = outcomes.next().await {
        let (path, outcome, processing_time_ms) = joined?;

        match outcome {
            Ok(result) => {
                if let Some(output_dir) = &args.output_dir {
                    write_output(output_dir, &path, &result, args.format)?;
                }
                results.push(ProcessResult {
                    path,
                    result: Some(result),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        result: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    overall_pb.abandon();
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }

        overall_pb.inc(1);
    }

    overall_pb.finish_with_message("Complete");

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let successful = results.len() - failed.len();

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn write_output(
    output_dir: &Path,
    input: &Path,
    result: &ExtractionResult,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let output_name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice");

    let output_path = output_dir.join(format!("{}.{}", output_name, format.extension()));
    fs::write(&output_path, format_result(result, format)?)?;
    debug!("Wrote output to {}", output_path.display());

    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "invoice_number",
        "total",
        "confidence",
        "backend",
        "processing_time_ms",
        "error",
    ])?;

    for entry in results {
        let filename = entry
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(result) = &entry.result {
            wtr.write_record([
                filename,
                "success",
                result.invoice_number.as_deref().unwrap_or(""),
                &format!("{:.2}", result.amounts.total),
                &format!("{:.2}", result.confidence),
                &result.backend_id,
                &entry.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                &entry.processing_time_ms.to_string(),
                entry.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");

        let results = vec![
            ProcessResult {
                path: PathBuf::from("scans/a.png"),
                result: Some(ExtractionResult {
                    invoice_number: Some("ABC2024000000001".to_string()),
                    backend_id: "tesseract".to_string(),
                    confidence: 0.85,
                    ..Default::default()
                }),
                error: None,
                processing_time_ms: 120,
            },
            ProcessResult {
                path: PathBuf::from("scans/b.png"),
                result: None,
                error: Some("failed to read image".to_string()),
                processing_time_ms: 3,
            },
        ];

        write_summary(&path, &results).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "filename,status,invoice_number,total,confidence,backend,processing_time_ms,error");
        assert_eq!(lines[1], "a.png,success,ABC2024000000001,0.00,0.85,tesseract,120,");
        assert_eq!(lines[2], "b.png,error,,,,,3,failed to read image");
    }

    #[test]
    fn test_write_output_uses_stem_and_format() {
        let dir = tempfile::tempdir().unwrap();
        write_output(dir.path(), Path::new("in/fatura-01.jpg"), &ExtractionResult::default(), OutputFormat::Text).unwrap();
        assert!(dir.path().join("fatura-01.txt").exists());
    }
}
