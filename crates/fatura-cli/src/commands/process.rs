//! Process command - extract data from a single invoice image.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use fatura_core::{BackendVariant, ExtractionResult, FaturaConfig, InvoiceEngine};

use super::config::load_config;
use super::is_supported_image;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input image
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(flatten)]
    engine: EngineArgs,

    /// Show recognition confidence and backend
    #[arg(long)]
    show_confidence: bool,
}

/// Engine overrides shared by `process` and `batch`.
#[derive(Args, Clone)]
pub struct EngineArgs {
    /// Model directory for the ONNX backend
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Recognition backend to use (repeat to set an order: tesseract, onnx)
    #[arg(short, long = "backend", value_parser = str::parse::<BackendVariant>)]
    backends: Vec<BackendVariant>,

    /// Skip denoising and binarization
    #[arg(long)]
    basic: bool,
}

impl EngineArgs {
    /// Apply the overrides on top of the loaded configuration.
    pub fn apply(&self, mut config: FaturaConfig) -> FaturaConfig {
        if let Some(model_dir) = &self.model_dir {
            config.recognition.model_dir = model_dir.clone();
        }
        if !self.backends.is_empty() {
            config.recognition.backends = self.backends.clone();
        }
        if self.basic {
            config.preprocessing.advanced = false;
        }
        config
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = args.engine.apply(load_config(config_path)?);

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if !is_supported_image(&args.input) {
        anyhow::bail!("Unsupported file format: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);

    pb.set_message("Loading recognition backend...");
    let engine = InvoiceEngine::new(config);
    let capabilities = engine.initialize()?;
    debug!("Backend capabilities: {:?}", capabilities);

    pb.set_message("Running OCR...");
    let result = engine.process_invoice(&args.input)?;
    pb.finish_and_clear();

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Recognition confidence: {:.1}% ({}, {} words)",
            style("ℹ").blue(),
            result.confidence * 100.0,
            result.backend_id,
            result.word_count
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Render an extraction result in the requested format.
pub fn format_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "invoice_number",
        "issue_date",
        "due_date",
        "supplier_name",
        "supplier_tax_id",
        "customer_name",
        "customer_tax_id",
        "subtotal",
        "tax",
        "total",
        "confidence",
        "backend",
    ])?;

    wtr.write_record([
        result.invoice_number.clone().unwrap_or_default(),
        result.issue_date.map(|d| d.to_string()).unwrap_or_default(),
        result.due_date.map(|d| d.to_string()).unwrap_or_default(),
        result.supplier.name.clone().unwrap_or_default(),
        result.supplier.tax_id.clone().unwrap_or_default(),
        result.customer.name.clone().unwrap_or_default(),
        result.customer.tax_id.clone().unwrap_or_default(),
        format!("{:.2}", result.amounts.subtotal),
        format!("{:.2}", result.amounts.tax),
        format!("{:.2}", result.amounts.total),
        format!("{:.2}", result.confidence),
        result.backend_id.clone(),
    ])?;

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_text(result: &ExtractionResult) -> String {
    fn or_dash(value: Option<&str>) -> &str {
        value.unwrap_or("-")
    }

    let mut output = String::new();

    output.push_str(&format!("Invoice: {}\n", or_dash(result.invoice_number.as_deref())));
    if let Some(date) = result.issue_date {
        output.push_str(&format!("Date: {}\n", date));
    }
    output.push('\n');

    output.push_str("Supplier:\n");
    output.push_str(&format!("  {}\n", or_dash(result.supplier.name.as_deref())));
    if let Some(tax_id) = &result.supplier.tax_id {
        output.push_str(&format!("  VKN/TCKN: {}\n", tax_id));
    }
    if let Some(address) = &result.supplier.address {
        output.push_str(&format!("  {}\n", address));
    }
    if let Some(phone) = &result.supplier.phone {
        output.push_str(&format!("  Tel: {}\n", phone));
    }
    if let Some(email) = &result.supplier.email {
        output.push_str(&format!("  E-Posta: {}\n", email));
    }
    output.push('\n');

    output.push_str("Customer:\n");
    output.push_str(&format!("  {}\n", or_dash(result.customer.name.as_deref())));
    if let Some(tax_id) = &result.customer.tax_id {
        output.push_str(&format!("  VKN/TCKN: {}\n", tax_id));
    }
    if let Some(address) = &result.customer.address {
        output.push_str(&format!("  {}\n", address));
    }
    output.push('\n');

    output.push_str("Summary:\n");
    output.push_str(&format!("  Subtotal: {:.2}\n", result.amounts.subtotal));
    output.push_str(&format!("  Tax:      {:.2}\n", result.amounts.tax));
    output.push_str(&format!("  Total:    {:.2}\n", result.amounts.total));

    if let Some(due_date) = result.due_date {
        output.push_str(&format!("\nPayment due: {}\n", due_date));
    }

    output
}
