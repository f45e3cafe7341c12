//! Extract command - run field extraction on already recognized text.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

use rcpt_core::ocr::RawText;
use rcpt_core::receipt::{ExtractionResult, ReceiptParser};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Text file to read, or `-` for stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: ExtractFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ExtractFormat {
    /// JSON with fields, evidence and warnings
    Json,
    /// Plain text listing
    Text,
}

pub async fn run(args: ExtractArgs) -> anyhow::Result<()> {
    let text = read_input(&args.input)?;
    let result = ReceiptParser::new().parse(&text);

    match args.format {
        ExtractFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        ExtractFormat::Text => print!("{}", format_text(&result)),
    }

    Ok(())
}

fn read_input(input: &Path) -> anyhow::Result<RawText> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(RawText::new(text));
    }

    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    Ok(RawText::new(std::fs::read_to_string(input)?))
}

fn format_text(result: &ExtractionResult) -> String {
    let mut output = String::new();

    for (field, found) in &result.evidence {
        output.push_str(&format!(
            "{:<13} {:<20} {} {:.1}\n",
            field.as_str(),
            found.value,
            style(format!("{:?}", found.source)).dim(),
            found.confidence
        ));
    }

    for warning in &result.warnings {
        output.push_str(&format!("{} {}\n", style("!").yellow(), warning));
    }

    output
}
