//! Tabula CLI - content addressing and index reconciliation from the shell
//!
//! Every subcommand prints one JSON document to stdout; logs go to stderr.

mod commands;
mod config;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::commands::{ArticleBodyArgs, WatchArgs};
use crate::config::{Args, Command, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("tabula={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }

    if let Err(e) = args.validate() {
        error!("Argument error: {}", e);
        std::process::exit(2);
    }

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };
    debug!(ipfs = %config.ipfs.api_url, pinning = %config.pinning.service, "Configuration loaded");

    let output = match &args.command {
        Command::Encode { file } => commands::encode(&config, file).await?,
        Command::Decode { address, out } => commands::decode(&config, address, out.as_deref()).await?,
        Command::ArticleBody {
            title,
            html_file,
            tags,
            description,
            image_file,
            on_chain,
            publication_id,
            id,
        } => {
            commands::article_body(
                &config,
                ArticleBodyArgs {
                    title,
                    html_file,
                    tags,
                    description: description.as_deref(),
                    image_file: image_file.as_deref(),
                    on_chain: *on_chain,
                    publication_id,
                    id: id.as_deref(),
                },
            )
            .await?
        }
        Command::LogId { chain_id, tag, receipt } => commands::log_id(&config, *chain_id, tag, receipt)?,
        Command::Watch {
            chain_id,
            kind,
            entity,
            id,
            log_id,
            last_updated,
        } => {
            commands::watch(
                &config,
                WatchArgs {
                    chain_id: *chain_id,
                    kind: (*kind).into(),
                    entity: (*entity).into(),
                    id,
                    log_id: log_id.as_deref(),
                    last_updated: last_updated.as_deref(),
                },
            )
            .await?
        }
        Command::PinStatus { address } => commands::pin_status(&config, address).await?,
        Command::Pin { address, label, local } => {
            commands::pin(&config, address, label.as_deref(), *local).await?
        }
        Command::Status => commands::status(&config).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
