//! Debit Note CLI
//!
//! Command-line tool for processing overdue-invoice ledgers and verifying
//! the processed output against an expected reference spreadsheet.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use dn_core::{
    compare_shape, detailed_mismatches, read_csv, summary_report, transform, value_comparison,
    InterestConfig, MismatchRecord, ReconcileOptions, ShapeComparison, SummaryReport, Table,
    ValueDiff, WorkingDaysPolicy,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "dn-cli")]
#[command(about = "Overdue-invoice interest processing and reconciliation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Configuration flags shared by the processing commands
///
/// Values come from the JSON config file when given, with individual flags
/// overriding it; defaults fill the rest.
#[derive(Args)]
struct ConfigArgs {
    /// Path to a JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Due days threshold for overdue filtering (1-365)
    #[arg(long)]
    due_days: Option<i64>,

    /// Per day interest rate in percent (0.01-1.0)
    #[arg(long)]
    daily_rate: Option<f64>,

    /// Working days in the interest period (1-31)
    #[arg(long)]
    working_days: Option<i64>,

    /// Age assigned to Customer Opening Balance entries (150-500)
    #[arg(long)]
    ob_age: Option<i64>,

    /// Working-days derivation policy (fixed or dynamic)
    #[arg(long)]
    policy: Option<WorkingDaysPolicy>,
}

impl ConfigArgs {
    fn resolve(&self) -> dn_core::Result<InterestConfig> {
        let mut config = match &self.config {
            Some(path) => InterestConfig::load(path)?,
            None => InterestConfig::default(),
        };

        if let Some(v) = self.due_days {
            config.due_days_threshold = v;
        }
        if let Some(v) = self.daily_rate {
            config.per_day_interest_rate = v;
        }
        if let Some(v) = self.working_days {
            config.interest_working_days = v;
        }
        if let Some(v) = self.ob_age {
            config.opening_balance_age = v;
        }
        if let Some(v) = self.policy {
            config.working_days_policy = v;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Process a raw ledger CSV into the interest-bearing output
    Process {
        /// Path to the raw CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the processed CSV
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Compare a processed CSV against an expected reference CSV
    Verify {
        /// Path to the processed CSV
        #[arg(short, long)]
        processed: PathBuf,

        /// Path to the expected reference CSV
        #[arg(short, long)]
        expected: PathBuf,

        /// Write the full comparison report to this JSON file
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Cap the number of matched keys evaluated in value comparison
        #[arg(long)]
        max_keys: Option<usize>,
    },

    /// Process a raw CSV and verify it against an expected CSV in one shot
    Run {
        /// Path to the raw CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the expected reference CSV
        #[arg(short, long)]
        expected: PathBuf,

        /// Output path for the processed CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Write the full comparison report to this JSON file
        #[arg(short, long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Parse and display a single CSV file
    Inspect {
        /// Path to CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Maximum number of rows to display
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Process every CSV file in a directory
    Batch {
        /// Directory to scan for raw CSV files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Directory for processed output files
        #[arg(short, long)]
        output_dir: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Comparison report artifact written by `verify` and `run`
#[derive(Serialize)]
struct VerificationReport {
    generated_at: DateTime<Utc>,
    summary: SummaryReport,
    shape: ShapeComparison,
    mismatches: Vec<MismatchRecord>,
    value_diffs: Vec<ValueDiff>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> dn_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            config,
        } => cmd_process(&input, &output, &config.resolve()?),
        Commands::Verify {
            processed,
            expected,
            report,
            max_keys,
        } => cmd_verify(&processed, &expected, report.as_deref(), max_keys),
        Commands::Run {
            input,
            expected,
            output,
            report,
            config,
        } => cmd_run(&input, &expected, &output, report.as_deref(), &config.resolve()?),
        Commands::Inspect { file, limit } => cmd_inspect(&file, limit),
        Commands::Batch {
            input_dir,
            output_dir,
            config,
        } => cmd_batch(&input_dir, &output_dir, &config.resolve()?),
    }
}

fn cmd_process(input: &Path, output: &Path, config: &InterestConfig) -> dn_core::Result<()> {
    let processed = process_file(input, output, config)?;

    println!(
        "Processed {} -> {} ({} rows)",
        input.display(),
        output.display(),
        processed.row_count()
    );

    if let Some(stats) = processed.column_stats("interest amount") {
        println!();
        println!("Interest amount:");
        println!("  total: {:.4}", stats.sum);
        println!("  mean:  {:.4}", stats.mean);
        println!("  max:   {:.4}", stats.max);
        println!("  min:   {:.4}", stats.min);
    }

    Ok(())
}

fn cmd_verify(
    processed_path: &Path,
    expected_path: &Path,
    report_path: Option<&Path>,
    max_keys: Option<usize>,
) -> dn_core::Result<()> {
    let processed = read_csv(processed_path)?;
    let expected = read_csv(expected_path)?;

    verify_tables(&processed, &expected, report_path, max_keys)
}

fn cmd_run(
    input: &Path,
    expected_path: &Path,
    output: &Path,
    report_path: Option<&Path>,
    config: &InterestConfig,
) -> dn_core::Result<()> {
    let processed = process_file(input, output, config)?;
    println!(
        "Processed {} -> {} ({} rows)",
        input.display(),
        output.display(),
        processed.row_count()
    );
    println!();

    let expected = read_csv(expected_path)?;
    verify_tables(&processed, &expected, report_path, None)
}

fn process_file(input: &Path, output: &Path, config: &InterestConfig) -> dn_core::Result<Table> {
    let raw = read_csv(input)?;
    log::info!("read {} rows from {}", raw.row_count(), input.display());

    let processed = transform(&raw, config)?;
    dn_core::write_csv(&processed, output)?;
    Ok(processed)
}

fn verify_tables(
    processed: &Table,
    expected: &Table,
    report_path: Option<&Path>,
    max_keys: Option<usize>,
) -> dn_core::Result<()> {
    let options = ReconcileOptions {
        max_keys,
        ..ReconcileOptions::default()
    };

    let shape = compare_shape(processed, expected);
    let mismatches = detailed_mismatches(processed, expected, &options)?;
    let value_diffs = value_comparison(processed, expected, &options)?;
    let summary = summary_report(processed, expected);

    println!(
        "Rows: processed {} / expected {} (difference {:+})",
        shape.rows.processed_rows, shape.rows.expected_rows, shape.rows.difference
    );

    if shape.columns.columns_match {
        println!("Columns match");
    } else {
        println!("Columns differ:");
        if !shape.columns.extra_in_processed.is_empty() {
            println!("  extra in processed: {}", shape.columns.extra_in_processed.join(", "));
        }
        if !shape.columns.missing_in_processed.is_empty() {
            println!(
                "  missing in processed: {}",
                shape.columns.missing_in_processed.join(", ")
            );
        }
    }

    if let Some(customers) = &shape.customers {
        if !customers.extra_in_processed.is_empty() {
            println!("Customers only in processed: {}", customers.extra_in_processed.join(", "));
        }
        if !customers.missing_in_processed.is_empty() {
            println!("Customers only in expected: {}", customers.missing_in_processed.join(", "));
        }
    }

    println!();
    if mismatches.is_empty() {
        println!("No mismatches found! Data matches perfectly.");
    } else {
        println!("Row mismatches ({}):", mismatches.len());
        for record in &mismatches {
            println!(
                "  [{}] {} / {} (Type: {}, Age: {}, Balance Due: {}, Interest: {})",
                record.mismatch_type,
                record.customer_name,
                record.transaction,
                record.entry_type,
                record.age,
                record.balance_due,
                record.interest_amount
            );
        }
    }

    println!();
    if value_diffs.is_empty() {
        println!("All compared values match!");
    } else {
        println!("Value differences ({}):", value_diffs.len());
        for diff in &value_diffs {
            let delta = diff
                .difference
                .map(|d| format!("{:+.4}", d))
                .unwrap_or_else(|| "N/A".to_string());
            println!(
                "  {} / {} [{}]: {} vs {} (difference {})",
                diff.customer_name,
                diff.transaction,
                diff.column,
                diff.processed_value,
                diff.expected_value,
                delta
            );
        }
    }

    if let Some(path) = report_path {
        let report = VerificationReport {
            generated_at: Utc::now(),
            summary,
            shape,
            mismatches,
            value_diffs,
        };
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)?;
        println!();
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn cmd_inspect(file: &Path, limit: usize) -> dn_core::Result<()> {
    let table = read_csv(file)?;

    println!("File: {}", file.display());
    println!("Columns: {}", table.column_count());
    println!("Rows: {}", table.row_count());
    println!();

    let header: Vec<&str> = table.column_names();
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    for row in table.rows.iter().take(limit) {
        let values: Vec<String> = row.cells.iter().map(|c| c.to_string_value()).collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > limit {
        println!("... ({} more rows)", table.row_count() - limit);
    }

    Ok(())
}

fn cmd_batch(input_dir: &Path, output_dir: &Path, config: &InterestConfig) -> dn_core::Result<()> {
    fs::create_dir_all(output_dir)?;

    let mut processed_count = 0;
    let mut total_rows = 0;
    let mut errors: Vec<(PathBuf, String)> = Vec::new();

    for entry in WalkDir::new(input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "csv") {
            continue;
        }

        let Some(file_name) = path.file_name() else {
            continue;
        };
        let output = output_dir.join(file_name);

        match process_file(path, &output, config) {
            Ok(table) => {
                processed_count += 1;
                total_rows += table.row_count();
                println!("  {} -> {} ({} rows)", path.display(), output.display(), table.row_count());
            }
            Err(e) => {
                errors.push((path.to_path_buf(), e.to_string()));
            }
        }
    }

    println!();
    println!("Batch complete:");
    println!("  {} files processed, {} output rows", processed_count, total_rows);

    if !errors.is_empty() {
        println!("\nErrors ({}):", errors.len());
        for (path, err) in &errors {
            println!("  {}: {}", path.display(), err);
        }
    }

    Ok(())
}
