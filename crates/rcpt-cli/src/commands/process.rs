//! Process command - scan a single receipt image.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use rcpt_core::models::receipt::{ReceiptRecord, RECEIPT_CSV_COLUMNS};
use rcpt_core::pipeline::{create_pipeline, load_raw_image, ScanOutcome};

use super::config::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input receipt image
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show which fields were recovered and which were defaulted
    #[arg(long)]
    show_provenance: bool,
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
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pipeline = create_pipeline(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create text recognizer: {}", e))?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );

    pb.set_message("Loading image...");
    pb.set_position(10);
    let image = load_raw_image(&args.input);

    pb.set_message("Normalizing and recognizing...");
    pb.set_position(30);
    let outcome = pipeline.process_image(&image, &args.input);

    pb.set_position(100);
    pb.finish_and_clear();

    let output = format_record(&outcome.record, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_provenance {
        print_provenance(&outcome);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn print_provenance(outcome: &ScanOutcome) {
    eprintln!();
    for (field, source) in &outcome.record.provenance {
        eprintln!("{} {}: {:?}", style("ℹ").blue(), field, source);
    }
    if outcome.skew_degrees != 0.0 {
        eprintln!(
            "{} Skew corrected by {:.2} degrees",
            style("ℹ").blue(),
            outcome.skew_degrees
        );
    }
    if let Some(error) = &outcome.recognition_error {
        eprintln!("{} Recognition failed: {}", style("!").yellow(), error);
    }
}

/// Render a record in the requested format.
pub fn format_record(record: &ReceiptRecord, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Csv => format_csv(std::slice::from_ref(record)),
        OutputFormat::Text => Ok(format_text(record)),
    }
}

/// CSV with a header row followed by one row per record.
pub fn format_csv(records: &[ReceiptRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(RECEIPT_CSV_COLUMNS)?;
    for record in records {
        wtr.write_record(record.csv_row())?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(record: &ReceiptRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("Receipt: {}\n", record.id));
    output.push_str(&format!("Vendor:  {}\n", record.vendor));
    output.push_str(&format!("Date:    {}\n", record.date));
    output.push_str("\n");
    output.push_str(&format!("  Tax:   {} {}\n", record.tax_amount, record.currency));
    output.push_str(&format!("  Total: {} {}\n", record.total_amount, record.currency));
    output.push_str("\n");
    output.push_str(&format!("Category: {}\n", record.category));
    output.push_str(&format!("Payment:  {}\n", record.payment_method));

    if !record.notes.is_empty() {
        output.push_str(&format!("Notes:    {}\n", record.notes));
    }

    output
}
