//! crossbill CLI
//!
//! Command-line interface for generating the cross-vendor transactions
//! report from the commerce platform.

use anyhow::{bail, Context, Result};
use cb_client::{AuthConfig, CommerceClient};
use cb_core::{DateRange, ProgressSink, ReportFilter, ReportPipeline, RowResult};
use cb_observability::LoggingConfig;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use futures::Stream;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod render;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "crossbill")]
#[command(version)]
#[command(about = "Cross-vendor transactions report for the commerce platform", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", default_value = "crossbill.yaml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Csv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the transactions report
    Generate {
        /// Include records created at or after this ISO 8601 timestamp
        #[arg(long, value_name = "DATETIME")]
        after: Option<String>,

        /// Include records created at or before this ISO 8601 timestamp
        #[arg(long, value_name = "DATETIME")]
        before: Option<String>,

        /// Output format (csv, json)
        #[arg(long, default_value = "csv")]
        format: OutputFormat,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Suppress the progress bar
        #[arg(long)]
        quiet: bool,
    },

    /// Validate configuration
    Validate,

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate {
            after,
            before,
            format,
            output,
            quiet,
        } => {
            let config = AppConfig::load(&cli.config)?;
            init_logging(cli.verbose, &config);
            generate(
                config,
                date_filter(after.clone(), before.clone())?,
                *format,
                output.clone(),
                *quiet,
            )
            .await
        }
        Commands::Validate => validate(&cli.config),
        Commands::Config { show_secrets } => show_config(&cli.config, *show_secrets),
    }
}

fn init_logging(verbose: bool, config: &AppConfig) {
    let mut logging = if verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::default()
    };
    if !verbose {
        if let Ok(level) = config.logging.level.parse() {
            logging.level = level;
        }
    }
    logging.json_format = config.logging.json_format;
    cb_observability::init_logging_with_config(logging);
}

fn date_filter(after: Option<String>, before: Option<String>) -> Result<ReportFilter> {
    match (after, before) {
        (None, None) => Ok(ReportFilter::default()),
        (Some(after), Some(before)) => Ok(ReportFilter {
            date: Some(DateRange { after, before }),
        }),
        _ => bail!("--after and --before must be provided together"),
    }
}

async fn generate(
    config: AppConfig,
    filter: ReportFilter,
    format: OutputFormat,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let client = Arc::new(
        CommerceClient::new(config.platform.clone())
            .context("Failed to create platform client")?,
    );
    let pipeline =
        ReportPipeline::new(client.clone(), client).with_concurrency(config.workers);

    let bar = if quiet { None } else { Some(progress_bar()) };
    let sink = bar.clone().map(|bar| {
        let sink: ProgressSink = Arc::new(move |current, total| {
            bar.set_length(total);
            bar.set_position(current);
        });
        sink
    });

    let stream = pipeline.run(&filter, sink).await?;

    let rows = match &output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_report(stream, format, file).await?
        }
        None => write_report(stream, format, std::io::stdout().lock()).await?,
    };

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    eprintln!("{} {} rows", "report complete:".green().bold(), rows);
    Ok(())
}

async fn write_report<W, S>(stream: S, format: OutputFormat, writer: W) -> Result<u64>
where
    W: std::io::Write,
    S: Stream<Item = RowResult> + Unpin,
{
    match format {
        OutputFormat::Csv => render::render_csv(stream, writer).await,
        OutputFormat::Json => render::render_json(stream, writer).await,
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} records")
            .expect("valid progress template")
            .progress_chars("=>-"),
    );
    bar
}

fn validate(path: &Path) -> Result<()> {
    let config = match AppConfig::load(path) {
        Ok(config) => {
            println!("{} configuration parses", "✓".green());
            config
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            bail!("configuration is invalid");
        }
    };

    let mut failures = 0;

    let base_url = &config.platform.client.base_url;
    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        println!("{} base_url: {}", "✓".green(), base_url);
    } else {
        println!("{} base_url must start with http:// or https://", "✗".red());
        failures += 1;
    }

    match config.platform.client.auth {
        AuthConfig::None => {
            println!(
                "{} no authentication configured; the platform will reject requests",
                "!".yellow()
            );
        }
        _ => println!("{} authentication configured", "✓".green()),
    }

    if config.workers == 0 {
        println!("{} workers must be at least 1", "✗".red());
        failures += 1;
    } else {
        println!("{} workers: {}", "✓".green(), config.workers);
    }

    if failures > 0 {
        bail!("{} check(s) failed", failures);
    }
    println!("{}", "configuration OK".green().bold());
    Ok(())
}

fn show_config(path: &Path, show_secrets: bool) -> Result<()> {
    let config = AppConfig::load(path)?;
    let shown = if show_secrets {
        config
    } else {
        config.redact_secrets()
    };
    println!("{}", serde_yaml::to_string(&shown)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert!(matches!("csv".parse(), Ok(OutputFormat::Csv)));
        assert!(matches!("JSON".parse(), Ok(OutputFormat::Json)));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_date_filter_requires_both_bounds() {
        assert!(date_filter(None, None).unwrap().date.is_none());
        assert!(date_filter(Some("2024-01-01T00:00:00".into()), None).is_err());
        let filter = date_filter(
            Some("2024-01-01T00:00:00".into()),
            Some("2024-06-30T23:59:59".into()),
        )
        .unwrap();
        assert_eq!(filter.date.unwrap().after, "2024-01-01T00:00:00");
    }
}
