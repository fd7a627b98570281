pub mod cli;
pub mod clients;
pub mod config;
pub mod domain;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod store;

use chrono::{Datelike, Local};
use clap::Parser;
use cli::{Cli, Commands, cmd_charts, cmd_clean, cmd_export, cmd_fetch, year_selection};
pub use config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Calendar year on the local clock.
#[must_use]
pub fn current_year() -> i32 {
    Local::now().year()
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Init) {
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Edit config.toml and run again.");
        } else {
            println!("config.toml already exists, leaving it untouched.");
        }
        return Ok(());
    }

    let config = Config::load()?;
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    info!(start_year = config.general.start_year, "season-tracker starting");

    match cli.command {
        Commands::Fetch {
            provider,
            year,
            current_years_only,
            all_years: _,
            season,
        } => {
            let selection = year_selection(year, current_years_only);
            cmd_fetch(&config, provider, &selection, season).await
        }
        Commands::Clean { provider } => cmd_clean(&config, provider).await,
        Commands::Export { provider } => cmd_export(&config, provider).await,
        Commands::Charts { provider } => cmd_charts(&config, provider).await,
        Commands::Init => Ok(()),
    }
}
