// src/main.rs

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};
use std::fs;
use std::sync::Arc;

use marketdesk::config::{Command, CommandLineInput, Config};
use marketdesk::delivery::{ConsoleNotifier, SystemClipboard};
use marketdesk::{
    AppState, DashboardData, Environment, ExportOutcome, ExportPipeline, ExportReport,
    ExportRequest, SurfaceRasterizer,
};

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("marketdesk.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Host primitives available to a command-line export.
fn export_environment(config: &Config, out_dir: Option<std::path::PathBuf>) -> Environment {
    let download_dir = out_dir.unwrap_or_else(|| config.download_dir.clone());
    let mut env = Environment::new(download_dir).with_notifier(Arc::new(ConsoleNotifier));

    if !config.user_agent.is_empty() {
        env = env.with_user_agent(config.user_agent.clone());
    }

    match SystemClipboard::probe() {
        Some(clipboard) => env = env.with_clipboard(Arc::new(clipboard)),
        None => log::info!("No system clipboard detected; copy is unavailable"),
    }

    env
}

fn report_export(report: &ExportReport) {
    let offered: Vec<&str> = report.offered.iter().map(|a| a.as_str()).collect();
    log::info!("Offered actions: {}", offered.join(", "));

    if report.points == 0 {
        eprintln!("⚠️  No data for the {} card; exported a placeholder.", report.card);
    }

    match &report.outcome {
        ExportOutcome::Downloaded(path) => println!("✓ Card saved to {}", path.display()),
        ExportOutcome::Copied => println!("✓ Card copied to clipboard"),
        ExportOutcome::Shared => println!("✓ Card shared"),
        ExportOutcome::ShareCancelled => println!("Share cancelled"),
        ExportOutcome::Failed(message) => eprintln!("✗ Export failed: {}", message),
        ExportOutcome::CaptureUnavailable | ExportOutcome::Unsupported | ExportOutcome::Ignored => {
            eprintln!("✗ Nothing exported ({:?})", report.outcome)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose).map_err(|e| anyhow::anyhow!(e))?;

    let config = Config::resolve(cli.verbose).context("invalid configuration")?;
    let store = config
        .data_store()
        .context("could not set up the data store")?;

    match cli.command {
        Command::Serve { bind } => {
            let state = AppState::new(store, config.quote_client())
                .with_revalidate_secret(config.revalidate_secret.clone());
            marketdesk::server::serve(bind, state)
                .await
                .with_context(|| format!("server on {} stopped", bind))?;
        }
        Command::Export {
            card,
            theme,
            action,
            out_dir,
        } => {
            let env = export_environment(&config, out_dir);
            let pipeline = ExportPipeline::new(
                Arc::new(DashboardData::new(store, config.quote_client())),
                Arc::new(SurfaceRasterizer::default()),
                env,
            );
            let report = pipeline
                .run(ExportRequest {
                    card,
                    theme,
                    action: action.into(),
                })
                .await;
            report_export(&report);

            if !report.outcome.is_delivered() && report.outcome != ExportOutcome::ShareCancelled {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
