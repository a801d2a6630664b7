use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xscribe_common::observability::{LogConfig, init_logging};
use xscribe_config::{XscribeConfig, XscribeConfigLoader};

mod commands;

const DEFAULT_CONFIG_FILE: &str = "xscribe.yaml";

/// Mirror the accounts you follow on X and relay collected tweets.
#[derive(Debug, Parser)]
#[command(name = "xscribe", version, about)]
struct Cli {
    /// YAML config file; skipped silently when the default one is absent.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Save every followed account to `<accounts-dir>/<handle>.json`.
    Following(commands::FollowingArgs),
    /// POST `tweets/<date>.json` to the archive server.
    Upload(commands::UploadArgs),
    /// Show the session cookies found in a browser `Cookie:` string.
    Cookies(commands::CookiesArgs),
}

fn load_config(path: Option<&PathBuf>) -> Result<XscribeConfig> {
    let loader = match path {
        Some(path) => XscribeConfigLoader::new().with_file(path),
        None => XscribeConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    loader.load().context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_ref())?;

    let log_path = init_logging(LogConfig {
        app_name: "xscribe",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.emit_stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::debug!(log = %log_path.display(), "logging.ready");

    match cli.command {
        Command::Following(args) => commands::following(&cfg, args).await,
        Command::Upload(args) => commands::upload(&cfg, args).await,
        Command::Cookies(args) => commands::cookies(args),
    }
}
