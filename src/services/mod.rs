pub mod season_source;
pub use season_source::{BangumiSeasonSource, JikanSeasonSource, SeasonSource};

pub mod fetch_service;
pub use fetch_service::{
    FetchPlan, FetchService, RunSummary, UnitOutcome, UnitReport, YearSelection,
};

pub mod cleaner;
pub use cleaner::{CleanReport, clean_store};

pub mod stats;

pub mod export;
pub use export::{ExportReport, export_catalog};

pub mod charts;
pub use charts::{ChartOptions, write_charts};
