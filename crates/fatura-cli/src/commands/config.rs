//! Config command - inspect and create the configuration file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use tracing::debug;

use fatura_core::{BackendVariant, FaturaConfig, RecognitionConfig};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration and backend readiness
    Show(ShowArgs),

    /// Write a configuration file with the built-in defaults
    Init(InitArgs),

    /// Show the default configuration file path
    Path,
}

#[derive(Args)]
struct ShowArgs {
    /// Print the raw configuration as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` on the command line.
    Explicit(PathBuf),
    /// The per-user configuration file.
    UserFile(PathBuf),
    /// No file; built-in defaults.
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(path) => write!(f, "{} (--config)", path.display()),
            ConfigSource::UserFile(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show(show_args) => show_config(config_path, show_args),
        ConfigCommand::Init(init_args) => init_config(init_args),
        ConfigCommand::Path => show_path(),
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fatura")
        .join("config.json")
}

/// Resolve the configuration: an explicit path wins, then the per-user file,
/// then the built-in defaults.
pub fn resolve_config(config_path: Option<&str>) -> anyhow::Result<(FaturaConfig, ConfigSource)> {
    let source = match config_path {
        Some(path) => ConfigSource::Explicit(PathBuf::from(path)),
        None => {
            let user_file = default_config_path();
            if user_file.exists() {
                ConfigSource::UserFile(user_file)
            } else {
                ConfigSource::Defaults
            }
        }
    };

    let config = match &source {
        ConfigSource::Explicit(path) | ConfigSource::UserFile(path) => {
            debug!("Loading config from {}", path.display());
            FaturaConfig::from_file(path)
                .map_err(|e| anyhow::anyhow!("Cannot read config {}: {}", path.display(), e))?
        }
        ConfigSource::Defaults => FaturaConfig::default(),
    };

    Ok((config, source))
}

/// Load the effective configuration.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FaturaConfig> {
    resolve_config(config_path).map(|(config, _)| config)
}

/// Readiness of one model file of the ONNX backend.
#[derive(Debug, PartialEq, Eq)]
struct ModelFileStatus {
    path: PathBuf,
    present: bool,
}

fn model_file_status(config: &RecognitionConfig) -> Vec<ModelFileStatus> {
    config
        .model_files()
        .into_iter()
        .map(|path| ModelFileStatus {
            present: path.is_file(),
            path,
        })
        .collect()
}

fn show_config(config_path: Option<&str>, args: ShowArgs) -> anyhow::Result<()> {
    let (config, source) = resolve_config(config_path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let recognition = &config.recognition;

    println!("{}", style("Configuration").bold());
    println!("Source: {}", source);
    println!();

    println!("{}", style("Backend preference").bold());
    for (rank, variant) in recognition.backends.iter().enumerate() {
        println!("  {}. {}", rank + 1, variant);
        match variant {
            BackendVariant::Tesseract => {
                println!("       binary:    {}", recognition.tesseract_binary.display());
                println!("       languages: {}", recognition.languages.join("+"));
            }
            BackendVariant::Onnx => {
                println!("       models:    {}", recognition.model_dir.display());
                for file in model_file_status(recognition) {
                    let name = file
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    if file.present {
                        println!("         {} {}", style("✓").green(), name);
                    } else {
                        println!("         {} {} (missing)", style("✗").red(), name);
                    }
                }
            }
        }
    }
    if recognition.backends.is_empty() {
        println!("  {} none configured", style("⚠").yellow());
    }
    println!();

    println!("{}", style("Preprocessing").bold());
    println!(
        "  mode:           {}",
        if config.preprocessing.advanced { "advanced" } else { "basic" }
    );
    println!("  max image size: {}px", config.preprocessing.max_image_size);

    Ok(())
}

fn init_config(args: InitArgs) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(default_config_path);

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    FaturaConfig::default().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn show_path() -> anyhow::Result<()> {
    let config_path = default_config_path();

    println!("Configuration file: {}", config_path.display());

    if config_path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'fatura config init' to create a configuration file.");
    }

    Ok(())
}
