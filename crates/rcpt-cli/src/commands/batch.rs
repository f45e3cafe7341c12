//! Batch command - scan many receipt images in parallel.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use rcpt_core::models::config::RcptConfig;
use rcpt_core::models::receipt::ReceiptRecord;
use rcpt_core::pipeline::{create_pipeline, ScanOutcome};

use super::config::load_config;
use super::process::{format_csv, format_record, OutputFormat};

const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching receipt images
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also write receipts.csv with every record
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = Arc::new(load_config(config_path)?);

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_image(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    // Surface recognizer setup problems once, before spawning workers.
    create_pipeline(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create text recognizer: {}", e))?;

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut outcomes = scan_parallel(files, args.jobs, config, pb.clone()).await?;
    outcomes.sort_by(|a, b| a.0.cmp(&b.0));

    pb.finish_with_message("Complete");

    if let Some(ref output_dir) = args.output_dir {
        let mut taken = HashSet::new();
        for (path, outcome) in &outcomes {
            let output_path = output_path(output_dir, path, args.format, &mut taken);
            fs::write(&output_path, format_record(&outcome.record, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("receipts.csv"))
            .unwrap_or_else(|| PathBuf::from("receipts.csv"));

        let records: Vec<ReceiptRecord> = outcomes.iter().map(|(_, o)| o.record.clone()).collect();
        fs::write(&summary_path, format_csv(&records)?)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = outcomes
        .iter()
        .filter(|(_, o)| o.recognition_error.is_some())
        .collect();
    let empty = outcomes
        .iter()
        .filter(|(_, o)| o.extraction.fields.recovered_count() == 0)
        .count();

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} with recognized fields, {} fully defaulted",
        style(outcomes.len() - empty).green(),
        style(empty).yellow()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Recognition failed for:").red());
        for (path, outcome) in &failed {
            eprintln!(
                "  - {}: {}",
                path.display(),
                outcome.recognition_error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Scan files on the blocking pool, one pipeline per worker.
async fn scan_parallel(
    files: Vec<PathBuf>,
    jobs: usize,
    config: Arc<RcptConfig>,
    pb: ProgressBar,
) -> anyhow::Result<Vec<(PathBuf, ScanOutcome)>> {
    let jobs = jobs.clamp(1, files.len());
    let files = Arc::new(files);
    let mut workers = JoinSet::new();

    for worker in 0..jobs {
        let files = Arc::clone(&files);
        let config = Arc::clone(&config);
        let pb = pb.clone();

        workers.spawn_blocking(move || -> anyhow::Result<Vec<(PathBuf, ScanOutcome)>> {
            let pipeline = create_pipeline(&config)
                .map_err(|e| anyhow::anyhow!("worker {}: {}", worker, e))?;

            let mut done = Vec::new();
            for path in files.iter().skip(worker).step_by(jobs) {
                let outcome = pipeline.process_path(path);
                if outcome.recognition_error.is_some() {
                    warn!("No text recognized for {}", path.display());
                }
                done.push((path.clone(), outcome));
                pb.inc(1);
            }
            Ok(done)
        });
    }

    let mut outcomes = Vec::with_capacity(files.len());
    while let Some(joined) = workers.join_next().await {
        outcomes.extend(joined??);
    }

    Ok(outcomes)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Output file for `input`, numbered `-2`, `-3`, ... when another input in
/// the batch already produced the same name.
fn output_path(
    output_dir: &Path,
    input: &Path,
    format: OutputFormat,
    taken: &mut HashSet<PathBuf>,
) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("receipt");

    let mut candidate = output_dir.join(format!("{}.{}", stem, format.extension()));
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = output_dir.join(format!("{}-{}.{}", stem, n, format.extension()));
        n += 1;
    }

    if n > 2 {
        warn!(
            "Output name for {} already used, writing {}",
            input.display(),
            candidate.display()
        );
    }

    taken.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("scans/IMG_001.JPG")));
        assert!(is_image(Path::new("receipt.png")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("README")));
    }

    #[test]
    fn test_output_path() {
        let mut taken = HashSet::new();
        let path = output_path(
            Path::new("out"),
            Path::new("in/shop.jpg"),
            OutputFormat::Csv,
            &mut taken,
        );
        assert_eq!(path, PathBuf::from("out/shop.csv"));
    }

    #[test]
    fn test_same_stem_gets_numbered_name() {
        let mut taken = HashSet::new();
        let out = Path::new("out");

        let names: Vec<PathBuf> = ["a/shop.jpg", "b/shop.png", "c/shop.tif", "cafe.png"]
            .iter()
            .map(|input| output_path(out, Path::new(input), OutputFormat::Json, &mut taken))
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("out/shop.json"),
                PathBuf::from("out/shop-2.json"),
                PathBuf::from("out/shop-3.json"),
                PathBuf::from("out/cafe.json"),
            ]
        );
    }
}
