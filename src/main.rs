use std::path::PathBuf;

use anyhow::Context;
use axum::extract::FromRef;
use clap::{Parser, Subcommand};

mod clock;
mod commands;
mod config;
mod controllers;
mod db;
mod error;
mod html;
mod models;
mod types;


use config::Config;
use db::Database;
pub(crate) use error::ApiResult;

/// Shared state handed to every command and request handler.
#[derive(Clone, FromRef)]
pub struct App {
    pub config: Config,
    pub database: Database,
}

/// A tiny pastebin with expiring, view-limited pastes.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the config file. Defaults to the user config directory.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: config::Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Create the database schema.
    InitDb,
    /// Delete pastes whose expiry has passed.
    PurgeExpired,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())
        .await
        .context("failed to load config")?;
    config.apply(cli.overrides);

    let database = Database::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    let app = App { config, database };

    match cli.command {
        Command::Serve => commands::serve::run(app).await,
        Command::InitDb => commands::init_db::run(app).await,
        Command::PurgeExpired => commands::purge_expired::run(app).await,
    }
}
