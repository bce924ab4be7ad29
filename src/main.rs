//! CLI entry point for the traffic survey formatter.
//!
//! Asks for the report destination and the survey export, then builds the
//! report while a spinner runs on the console.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Subscriber, error, info, instrument, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};
use traffic_formatter::config::FormatterConfig;
use traffic_formatter::entry::select_files;
use traffic_formatter::error::Diagnostics;
use traffic_formatter::formatter::validate::Verdict;
use traffic_formatter::formatter::{RunSummary, SectionContext, build_report};
use traffic_formatter::output::save_report;
use traffic_formatter::progress::Spinner;
use traffic_formatter::reader::open_survey;

#[derive(Parser)]
#[command(name = "traffic_formatter", version)]
#[command(about = "Formats traffic survey exports into intensity reports", long_about = None)]
struct Cli {}

fn console_layer<S>() -> Result<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    Ok(fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?)))
}

/// Colored stderr logging plus, when enabled, a plain `<report>.log` file.
/// The returned guard must live until exit so the file writer is flushed.
fn init_logging(config: &FormatterConfig, report_name: &str) -> Result<Option<WorkerGuard>> {
    let stderr_layer = console_layer()?;

    let (file_layer, guard) = if config.log_to_file {
        std::fs::create_dir_all(&config.log_dir).with_context(|| {
            format!("failed to create log directory {}", config.log_dir.display())
        })?;
        let appender =
            tracing_appender::rolling::never(&config.log_dir, format!("{report_name}.log"));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(EnvFilter::from_env("RUST_LOG_FILE").add_directive("debug".parse()?));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Reads the survey, builds the report and saves it. Runs on a blocking
/// thread.
#[instrument(skip_all, fields(source = %source.display(), output = %output.display()))]
fn run(source: &Path, output: &Path, ctx: &SectionContext) -> Result<(RunSummary, Diagnostics)> {
    let survey = open_survey(source)?;
    let mut diagnostics = Diagnostics::new();
    let (report, summary) = build_report(&survey, ctx, &mut diagnostics)?;
    save_report(&report, output)?;
    Ok((summary, diagnostics))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    let _cli = Cli::parse();

    let config = FormatterConfig::from_env()?;
    // The log file is named after the report, so selection logs to the console only.
    let selection = tracing::subscriber::with_default(
        tracing_subscriber::registry().with(console_layer()?),
        || select_files(&mut std::io::stdin().lock(), &mut std::io::stdout()),
    )?;
    let _guard = init_logging(&config, &selection.report_name)?;
    if config.log_to_file {
        info!(dir = %config.log_dir.display(), "logging to file");
    }
    info!(
        source = %selection.source.display(),
        output = %selection.output_path().display(),
        "files selected"
    );

    let ctx = config.section_context()?;
    let source = selection.source.clone();
    let output = selection.output_path();

    let spinner = Spinner::start("Processing survey");
    let result = tokio::task::spawn_blocking(move || run(&source, &output, &ctx)).await;
    spinner.stop().await;

    let (summary, diagnostics) = match result? {
        Ok(done) => done,
        Err(e) => {
            error!(error = %e, "report failed");
            return Err(e);
        }
    };

    for section in &summary.sections {
        match section.verdict {
            Verdict::Match => {
                info!(sheet = %section.name, grand_total = section.grand_total, "totals match")
            }
            Verdict::Mismatch => warn!(sheet = %section.name, "totals do not match"),
        }
    }
    info!(
        output = %selection.output_path().display(),
        diagnostics = diagnostics.len(),
        mismatches = summary.mismatches(),
        "report written"
    );
    Ok(())
}
