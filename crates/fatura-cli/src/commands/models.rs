//! Models command - download and manage the ONNX recognition models.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use futures_util::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use fatura_core::RecognitionConfig;

use super::config::load_config;

/// Default location the PaddleOCR ONNX exports are fetched from.
const DEFAULT_BASE_URL: &str = "https://github.com/jakubmatias/incr/raw/main/models/mobile";

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    command: ModelsCommand,

    /// Model directory (default: from configuration)
    #[arg(short, long, global = true)]
    model_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// Download models
    Download(DownloadArgs),

    /// Check model status
    Status,

    /// Remove downloaded models
    Clean,
}

#[derive(Args)]
struct DownloadArgs {
    /// Base URL the model files are fetched from
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Force re-download even if files exist
    #[arg(long)]
    force: bool,
}

/// A model file expected in the model directory.
struct ModelFile {
    filename: String,
    description: &'static str,
    /// Rough size, used to spot truncated downloads.
    size_bytes: u64,
}

fn model_files(config: &RecognitionConfig) -> [ModelFile; 3] {
    [
        ModelFile {
            filename: config.detection_model.clone(),
            description: "text detection",
            size_bytes: 4_500_000,
        },
        ModelFile {
            filename: config.recognition_model.clone(),
            description: "Latin script recognition",
            size_bytes: 7_500_000,
        },
        ModelFile {
            filename: config.dictionary.clone(),
            description: "character dictionary",
            size_bytes: 2_000,
        },
    ]
}

pub async fn run(args: ModelsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?.recognition;
    if let Some(model_dir) = args.model_dir {
        config.model_dir = model_dir;
    }

    match args.command {
        ModelsCommand::Download(download_args) => download_models(&config, download_args).await,
        ModelsCommand::Status => check_status(&config).map(|_| ()),
        ModelsCommand::Clean => clean_models(&config),
    }
}

async fn download_models(config: &RecognitionConfig, args: DownloadArgs) -> anyhow::Result<()> {
    let output_dir = &config.model_dir;
    fs::create_dir_all(output_dir)?;

    println!(
        "{} Downloading models to {}",
        style("ℹ").blue(),
        output_dir.display()
    );
    println!();

    let client = reqwest::Client::builder()
        .user_agent(concat!("fatura-cli/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let multi_progress = MultiProgress::new();
    let mut success_count = 0;
    let mut skip_count = 0;
    let mut error_count = 0;

    for model in model_files(config) {
        let path = output_dir.join(&model.filename);

        if path.exists() && !args.force {
            let size = fs::metadata(&path)?.len();
            if size > model.size_bytes / 2 {
                println!(
                    "  {} {} (already exists, {})",
                    style("✓").green(),
                    model.filename,
                    format_size(size)
                );
                skip_count += 1;
                continue;
            }
        }

        let url = format!("{}/{}", args.base_url.trim_end_matches('/'), model.filename);

        let pb = multi_progress.add(ProgressBar::new(model.size_bytes));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} {msg:<30} [{bar:25.cyan/blue}] {bytes}/{total_bytes}")?
                .progress_chars("=>-"),
        );
        pb.set_message(model.filename.clone());

        match download_file(&client, &url, &path, &pb).await {
            Ok(()) => {
                pb.finish_with_message(format!("{} {}", style("✓").green(), model.filename));
                success_count += 1;
            }
            Err(e) => {
                pb.finish_with_message(format!("{} {} - {}", style("✗").red(), model.filename, e));
                error_count += 1;
            }
        }
    }

    println!();

    if error_count == 0 {
        println!("{} Models downloaded successfully!", style("✓").green().bold());
        if skip_count > 0 {
            println!(
                "   {} downloaded, {} already present",
                success_count, skip_count
            );
        }
    } else {
        println!(
            "{} Download completed with errors",
            style("⚠").yellow().bold()
        );
        println!(
            "   {} downloaded, {} skipped, {} failed",
            success_count, skip_count, error_count
        );
        println!();
        println!("Retry with: fatura models download --force");
    }

    println!();
    check_status(config)?;

    if error_count > 0 {
        anyhow::bail!("{} model file(s) failed to download", error_count);
    }

    Ok(())
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    pb: &ProgressBar,
) -> anyhow::Result<()> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    if let Some(content_length) = response.content_length() {
        pb.set_length(content_length);
    }

    // Renamed into place once complete.
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush()?;
    drop(file);

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Print the state of each model file. Returns whether all are present.
fn check_status(config: &RecognitionConfig) -> anyhow::Result<bool> {
    let model_dir = &config.model_dir;

    println!("{}", style("Model Status").bold());
    println!("Directory: {}", model_dir.display());
    println!();

    let mut all_present = true;
    let mut total_size: u64 = 0;

    for model in model_files(config) {
        let path = model_dir.join(&model.filename);
        let (status, size_str) = if path.exists() {
            let size = fs::metadata(&path)?.len();
            total_size += size;

            if size > model.size_bytes / 2 {
                (style("✓").green(), format_size(size))
            } else {
                all_present = false;
                (style("⚠").yellow(), format!("{} (incomplete?)", format_size(size)))
            }
        } else {
            all_present = false;
            (style("✗").red(), "missing".to_string())
        };

        println!(
            "    {} {:<25} {:>16}  {}",
            status, model.filename, size_str, model.description
        );
    }

    if all_present {
        println!(
            "    {} Ready ({} total)",
            style("✓").green(),
            format_size(total_size)
        );
    } else {
        println!(
            "    {} Run 'fatura models download' to download",
            style("⚠").yellow()
        );
    }

    Ok(all_present)
}

fn clean_models(config: &RecognitionConfig) -> anyhow::Result<()> {
    let model_dir = &config.model_dir;

    if !model_dir.exists() {
        println!("{} No model files to remove.", style("ℹ").blue());
        return Ok(());
    }

    let mut total_removed = 0;
    let mut total_freed: u64 = 0;

    for model in model_files(config) {
        let path = model_dir.join(&model.filename);
        if path.exists() {
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            fs::remove_file(&path)?;
            total_removed += 1;
            total_freed += size;
            println!("  {} Removed {}", style("✓").green(), model.filename);
        }
    }

    // Leftovers from interrupted downloads
    for entry in fs::read_dir(model_dir)?.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "tmp") {
            fs::remove_file(&path)?;
        }
    }

    if total_removed > 0 {
        println!();
        println!(
            "{} Removed {} files, freed {}",
            style("✓").green(),
            total_removed,
            format_size(total_freed)
        );
    } else {
        println!("{} No model files to remove.", style("ℹ").blue());
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> RecognitionConfig {
        RecognitionConfig {
            model_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(2_000), "2.0KB");
        assert_eq!(format_size(7_500_000), "7.5MB");
    }

    #[test]
    fn test_status_reports_missing_models() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!check_status(&config_in(dir.path())).unwrap());
    }

    #[test]
    fn test_status_flags_truncated_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        for model in model_files(&config) {
            fs::write(dir.path().join(&model.filename), b"x").unwrap();
        }
        assert!(!check_status(&config).unwrap());
    }

    #[test]
    fn test_clean_removes_models_and_partial_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        fs::write(dir.path().join(&config.detection_model), b"onnx").unwrap();
        fs::write(dir.path().join("latin_rec.tmp"), b"partial").unwrap();
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        clean_models(&config).unwrap();

        assert!(!dir.path().join(&config.detection_model).exists());
        assert!(!dir.path().join("latin_rec.tmp").exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
