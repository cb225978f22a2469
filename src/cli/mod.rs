use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::ConfigLoader;
use crate::storage;

pub mod commands;

use self::commands::NewArgs;

#[derive(Parser, Debug)]
#[command(name = "cardbox", version, about = "Terminal board of colored checklist cards")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over CARDBOX_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over CARDBOX_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Keep the board in memory only; never touch the snapshot file
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive board (default)
    Tui,
    /// Create a new card from the command line
    New(NewArgs),
    /// Print the board without entering the TUI
    List,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("CARDBOX_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("CARDBOX_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let mut config = loader.load_or_init()?;
    config.storage.ephemeral = cli.ephemeral;
    let store = storage::init(&paths, &config.storage)?;

    let config = Arc::new(config);
    let command = cli.command.unwrap_or(Commands::Tui);
    match command {
        Commands::Tui => {
            let mut app = App::new(config, store);
            commands::run_tui(&mut app)
        }
        Commands::New(args) => commands::new_card(config, store, args),
        Commands::List => commands::list_cards(store),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
