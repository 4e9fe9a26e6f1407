//! CLI entry point for the comic API client.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use comicapi_core::config::resolve_default_config_path;
use comicapi_core::{ClientConfig, ComicApi, CredentialStore, MemoryCredentialStore, load_cookie_file};
use serde::Serialize;
use tracing::{debug, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = load_config(&args)?;
    let store: Arc<dyn CredentialStore> = match &args.cookies {
        Some(path) => {
            let store = load_cookie_file(path)
                .with_context(|| format!("failed to load cookies from {}", path.display()))?;
            info!(cookies = store.len(), "loaded cookie file");
            Arc::new(store)
        }
        None => Arc::new(MemoryCredentialStore::new()),
    };

    let api = ComicApi::new(config, store).context("invalid client configuration")?;

    let cancel = api.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match &args.command {
        Command::Details { comic } => {
            let details = api
                .comic_details(comic)
                .await
                .with_context(|| format!("no details returned for '{comic}'"))?;
            print_json(&details)
        }
        Command::Chapters { comic, group } => {
            let chapters = match group {
                Some(group) => api.chapter_list(comic, group).await,
                None => api.all_chapters(comic).await,
            };
            info!(count = chapters.len(), "chapters listed");
            print_json(&chapters)
        }
        Command::Pages { comic, chapter } => {
            let pages = api
                .chapter_pages(comic, chapter)
                .await
                .with_context(|| format!("no pages returned for chapter '{chapter}'"))?;
            print_json(&pages)
        }
    }
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => resolve_default_config_path().filter(|path| path.is_file()),
    };

    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config file");
            ClientConfig::from_file(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => {
            debug!("no config file found; using defaults");
            Ok(ClientConfig::default())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}
