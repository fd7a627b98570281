//! CLI module - Command-line interface for season-tracker
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

use crate::domain::{Provider, Season};
use crate::services::YearSelection;

/// season-tracker - Seasonal anime metadata collector
#[derive(Parser)]
#[command(name = "season-tracker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch seasons from a provider and update the local store
    #[command(alias = "f")]
    Fetch {
        #[arg(long, value_enum, default_value_t = Provider::Jikan)]
        provider: Provider,

        /// Specific years, comma separated
        #[arg(long, value_delimiter = ',', conflicts_with_all = ["current_years_only", "all_years"])]
        year: Vec<i32>,

        /// Only the current year and the next one
        #[arg(long, conflicts_with = "all_years")]
        current_years_only: bool,

        /// Every year from start_year to next year (default)
        #[arg(long)]
        all_years: bool,

        /// Restrict the run to one season
        #[arg(long)]
        season: Option<Season>,
    },

    /// Remove duplicate entries from stored seasons
    Clean {
        #[arg(long, value_enum, default_value_t = Provider::Jikan)]
        provider: Provider,
    },

    /// Write CSV statistics from stored seasons
    Export {
        #[arg(long, value_enum, default_value_t = Provider::Jikan)]
        provider: Provider,
    },

    /// Write JSON datasets for the web charts
    Charts {
        #[arg(long, value_enum, default_value_t = Provider::Jikan)]
        provider: Provider,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

/// Year selection from the `fetch` flags; no flag means every year.
#[must_use]
pub fn year_selection(year: Vec<i32>, current_years_only: bool) -> YearSelection {
    if !year.is_empty() {
        YearSelection::Specific(year)
    } else if current_years_only {
        YearSelection::Current
    } else {
        YearSelection::All
    }
}

pub use commands::*;
