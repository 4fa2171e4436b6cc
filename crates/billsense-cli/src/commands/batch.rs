//! Batch processing command for directories of OCR text dumps.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use billsense_core::{read_source, BillParser, ExtractionReport, FallbackDate, RuleBasedParser};

use super::process::{empty_report, format_report, OutputFormat};
use super::{load_config, resolve_fallback};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for OCR text files (e.g. "scans/*.txt")
    #[arg(required = true)]
    input: String,

    /// Output directory for per-file results
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

    /// Date used when no bill date is found (default: today, `none` disables)
    #[arg(long)]
    fallback_date: Option<String>,

    /// Reference date for date plausibility checks (default: today)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Include candidate traces in per-file output
    #[arg(long)]
    trace: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome of processing a single file.
struct FileResult {
    path: PathBuf,
    report: Option<ExtractionReport>,
    error: Option<String>,
    processing_time_ms: u64,
}

impl FileResult {
    fn status(&self) -> &'static str {
        match &self.report {
            None => "error",
            Some(report) if report.result.has_reading() => "success",
            Some(_) => "no_reading",
        }
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
        })
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

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let fallback = resolve_fallback(args.fallback_date.as_deref(), today);
    let parser = Arc::new(RuleBasedParser::from_config(&config).with_today(today));
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));

    let mut tasks = JoinSet::new();
    for path in files {
        let permit = semaphore.clone().acquire_owned().await?;
        let parser = Arc::clone(&parser);
        let fallback = fallback.clone();

        tasks.spawn_blocking(move || {
            let _permit = permit;
            let file_start = Instant::now();
            let outcome = process_single_file(&path, parser.as_ref(), fallback.as_ref());
            let processing_time_ms = file_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(report) => FileResult {
                    path,
                    report: Some(report),
                    error: None,
                    processing_time_ms,
                },
                Err(e) => FileResult {
                    path,
                    report: None,
                    error: Some(e.to_string()),
                    processing_time_ms,
                },
            }
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let result = joined?;
        if let Some(err) = &result.error {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", result.path.display(), err);
            } else {
                error!("Failed to process {}: {}", result.path.display(), err);
                // Dropping the set cancels queued files; ones already running finish.
                anyhow::bail!("Processing failed: {}", err);
            }
        }
        overall_pb.inc(1);
        results.push(result);
    }
    overall_pb.finish_with_message("Complete");

    results.sort_by(|a, b| a.path.cmp(&b.path));

    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            if let Some(report) = &result.report {
                let output_name = result
                    .path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("bill");
                let output_path =
                    output_dir.join(format!("{}.{}", output_name, args.format.extension()));

                fs::write(&output_path, format_report(report, args.format, args.trace)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

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

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let unread = results
        .iter()
        .filter(|r| r.status() == "no_reading")
        .count();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} without reading, {} failed",
        style(results.len() - failed.len() - unread).green(),
        style(unread).yellow(),
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

/// Run extraction on one file. Unreadable text yields an empty report; only
/// I/O failures are errors.
fn process_single_file(
    path: &Path,
    parser: &RuleBasedParser,
    fallback: Option<&FallbackDate>,
) -> anyhow::Result<ExtractionReport> {
    let file = fs::File::open(path)?;
    match read_source(file) {
        Ok(text) => Ok(parser.parse(&text, fallback)),
        Err(e) => {
            warn!("{}: {}", path.display(), e);
            Ok(empty_report(&e))
        }
    }
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "bill_kind",
        "units",
        "amount",
        "date",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time = result.processing_time_ms.to_string();

        match &result.report {
            Some(report) => wtr.write_record([
                filename,
                result.status(),
                &report.bill_kind.to_string(),
                &report.result.units.to_string(),
                &report.result.amount.to_string(),
                report.result.date.as_deref().unwrap_or(""),
                &time,
                "",
            ])?,
            None => wtr.write_record([
                filename,
                result.status(),
                "",
                "",
                "",
                "",
                &time,
                result.error.as_deref().unwrap_or(""),
            ])?,
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bill.txt");
        fs::write(&path, "Units Consumed: 250 kWh\nAmount Payable: Rs 1,245.50").unwrap();

        let parser = RuleBasedParser::new();
        let report = process_single_file(&path, &parser, None).unwrap();
        assert_eq!(report.result.units, 250.0);
        assert_eq!(report.result.amount, 1245.5);

        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "   \n").unwrap();
        let report = process_single_file(&empty, &parser, None).unwrap();
        assert!(!report.result.has_reading());
        assert_eq!(report.warnings.len(), 1);

        assert!(process_single_file(&dir.path().join("missing.txt"), &parser, None).is_err());
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let summary = dir.path().join("summary.csv");
        let results = vec![FileResult {
            path: PathBuf::from("missing.txt"),
            report: None,
            error: Some("not found".to_string()),
            processing_time_ms: 3,
        }];

        write_summary(&summary, &results).unwrap();
        let content = fs::read_to_string(&summary).unwrap();
        assert!(content.starts_with("filename,status,bill_kind"));
        assert!(content.contains("missing.txt,error,,,,,3,not found"));
    }
}
