//! Process command - extract fields from a single OCR text dump.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use clap::Args;
use console::style;
use tracing::{debug, info, warn};

use billsense_core::{read_source, BillParser, ExtractionReport, InputError, RuleBasedParser};

use super::{load_config, resolve_fallback};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// OCR text file, or `-` for stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Date used when no bill date is found: YYYY-MM-DD, free text, or
    /// `none` (default: today)
    #[arg(long)]
    fallback_date: Option<String>,

    /// Reference date for date plausibility checks (default: today)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Include competing candidates and year repairs in the output
    #[arg(long)]
    trace: bool,

    /// Fail when neither units nor amount could be read
    #[arg(long)]
    strict: bool,
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

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let fallback = resolve_fallback(args.fallback_date.as_deref(), today);
    let parser = RuleBasedParser::from_config(&config).with_today(today);

    let source = if args.input.as_os_str() == "-" {
        info!("Reading OCR text from stdin");
        read_source(io::stdin().lock())
    } else {
        if !args.input.exists() {
            anyhow::bail!("Input file not found: {}", args.input.display());
        }
        info!("Processing file: {}", args.input.display());
        read_source(fs::File::open(&args.input)?)
    };

    let report = match source {
        Ok(text) => parser.parse(&text, fallback.as_ref()),
        Err(e) => {
            warn!("{}, returning empty result", e);
            empty_report(&e)
        }
    };

    if args.strict && !report.result.has_reading() {
        anyhow::bail!(
            "Unable to read units or amount from {}",
            args.input.display()
        );
    }

    let output = format_report(&report, args.format, args.trace)?;

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

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// All-default report for a source that could not be used.
pub fn empty_report(error: &InputError) -> ExtractionReport {
    ExtractionReport {
        result: Default::default(),
        bill_kind: Default::default(),
        trace: Default::default(),
        warnings: vec![error.to_string()],
        processing_time_ms: 0,
    }
}

pub fn format_report(
    report: &ExtractionReport,
    format: OutputFormat,
    trace: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json if trace => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Json => Ok(serde_json::to_string(&report.result)?),
        OutputFormat::Csv => format_csv(report),
        OutputFormat::Text => Ok(format_text(report, trace)),
    }
}

fn format_csv(report: &ExtractionReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["units", "amount", "date", "bill_kind"])?;
    wtr.write_record([
        &report.result.units.to_string(),
        &report.result.amount.to_string(),
        report.result.date.as_deref().unwrap_or(""),
        &report.bill_kind.to_string(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &ExtractionReport, trace: bool) -> String {
    let mut output = String::new();
    let result = &report.result;

    output.push_str(&format!("Bill:   {}\n", report.bill_kind));
    output.push_str(&format!("Units:  {}\n", result.units));
    output.push_str(&format!("Amount: {:.2}\n", result.amount));
    output.push_str(&format!(
        "Date:   {}\n",
        result.date.as_deref().unwrap_or("-")
    ));

    if !report.warnings.is_empty() {
        output.push('\n');
        for warning in &report.warnings {
            output.push_str(&format!("warning: {}\n", warning));
        }
    }

    if trace {
        let t = &report.trace;
        for (field, candidates) in [("units", &t.units), ("amount", &t.amount), ("date", &t.date)] {
            output.push_str(&format!("\n{} candidates:\n", field));
            for c in candidates {
                output.push_str(&format!("  [{:>3}] {:<18} {}\n", c.priority, c.rule, c.value));
            }
        }
        for repair in &t.year_repairs {
            output.push_str(&format!(
                "\nyear repair: {} {} -> {} ({:?})\n",
                repair.token, repair.from, repair.to, repair.method
            ));
        }
        if t.fallback_date_used {
            output.push_str("\nfallback date used\n");
        }
    }

    output
}
