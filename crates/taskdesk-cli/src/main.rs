use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use std::sync::Arc;
use taskdesk_core::error::CoreError;
use taskdesk_core::models::{FilterState, ViewKind};
use taskdesk_core::source::{DataMode, DataSource};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod notify;
mod parser;
mod views;

use cli::Commands;
use views::table::TableContext;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = cli::Cli::parse();

    if let Err(e) = run(cli).await {
        handle_error(e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TASKDESK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: cli::Cli) -> anyhow::Result<()> {
    let config = config::Config::load().context("Failed to load configuration")?;
    let view = if cli.bin { ViewKind::Bin } else { ViewKind::Recurring };
    let api = config.api_client(view)?;
    let viewer = config.viewer()?;
    let tz = config.timezone()?;

    let mut engine = config.engine.to_engine_config();
    let (mode, filters) = match &cli.command {
        Commands::List(command) => {
            if let Some(size) = command.size {
                engine.page_size = size.max(1);
            }
            let mode = if command.aggregate {
                DataMode::Aggregate
            } else {
                DataMode::Paged
            };
            (mode, commands::list::filters_from(command, tz)?)
        }
        Commands::BulkReassign(_) => (DataMode::Aggregate, FilterState::default()),
        _ => (DataMode::Paged, FilterState::default()),
    };

    tracing::debug!(%view, ?mode, page_size = engine.page_size, "starting");

    let ctx = TableContext {
        tz,
        now: Utc::now(),
        bin: cli.bin,
        retention_days: engine.retention_days,
    };
    let mut source = DataSource::new(api, viewer, tz, engine)
        .with_mode(mode)
        .with_filters(filters)
        .with_notifier(Arc::new(notify::ConsoleNotifier));

    let result = match cli.command {
        Commands::List(command) => commands::list::list(&mut source, command, &ctx).await,
        Commands::Show(command) => commands::show::show(&mut source, command, &ctx).await,
        Commands::Delete(command) => commands::delete::delete(&mut source, command).await,
        Commands::Restore(command) => commands::restore::restore(&mut source, command).await,
        Commands::Purge(command) => commands::purge::purge(&mut source, command).await,
        Commands::Reassign(command) => commands::reassign::reassign(&mut source, command).await,
        Commands::BulkReassign(command) => {
            commands::bulk::bulk_reassign(&mut source, command).await
        }
    };

    source.teardown();
    result
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.chain().find_map(|e| e.downcast_ref::<CoreError>()) {
        match core_error {
            // The engine has already printed these through the notifier.
            CoreError::Network(_) | CoreError::PartialBulkFailure { .. } => {}
            CoreError::MissingDecisions(titles) => {
                eprintln!(
                    "{} Decide what to do with attachments first (--include-files or --exclude-files):",
                    "Error:".style(error_style)
                );
                for title in titles {
                    eprintln!("  {}", title.yellow());
                }
            }
            CoreError::NotForever(title) => {
                eprintln!(
                    "{} Series '{}' has an end date; only forever series can be reassigned",
                    "Error:".style(error_style),
                    title.yellow()
                );
            }
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
