use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

mod config;
mod export;
mod input;
mod inspect;
mod process;

#[derive(Debug, Parser)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Explode geosubmit files into routed observations, written as CSV
    Explode { files: Vec<PathBuf> },
    /// Load geosubmit files into memory and print per-table counts
    Process { files: Vec<PathBuf> },
    /// Print the shard and key for one transmitter
    Route {
        #[clap(subcommand)]
        command: inspect::RouteCommand,
    },
    /// Decode a base64 cell or area key
    Decode { key: String },
    /// List every table needed for the configured layout
    Tables,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Explode { files } => export::run(&config, input::submissions(&files)?)?,
        Command::Process { files } => process::run(&config, input::submissions(&files)?)?,
        Command::Route { command } => inspect::route(&config, command)?,
        Command::Decode { key } => inspect::decode(&key)?,
        Command::Tables => inspect::tables(&config),
    };

    Ok(())
}
