//! Fetch command handler

use std::sync::Arc;

use crate::config::Config;
use crate::domain::{Provider, Season};
use crate::services::{
    BangumiSeasonSource, FetchPlan, FetchService, JikanSeasonSource, SeasonSource, UnitOutcome,
    YearSelection,
};
use crate::store::SeasonStore;

pub async fn cmd_fetch(
    config: &Config,
    provider: Provider,
    selection: &YearSelection,
    season: Option<Season>,
) -> anyhow::Result<()> {
    let source: Arc<dyn SeasonSource> = match provider {
        Provider::Jikan => Arc::new(JikanSeasonSource::new(&config.jikan)?),
        Provider::Bangumi => Arc::new(BangumiSeasonSource::new(&config.bangumi)?),
    };

    let plan = FetchPlan::new(
        selection,
        season,
        config.general.start_year,
        crate::current_year(),
    );
    if plan.is_empty() {
        println!("Nothing to fetch.");
        return Ok(());
    }

    let store = SeasonStore::new(config.data_dir(provider));
    println!(
        "Fetching {} season(s) from {provider} into {}",
        plan.len(),
        store.root().display()
    );

    let service = FetchService::new(
        source,
        store,
        config.pipeline(provider),
        config.unit_delay(provider),
    );
    let summary = service.run(&plan).await?;

    for report in &summary.units {
        match &report.outcome {
            UnitOutcome::Persisted(count) => println!("  ✓ {}: {count} saved", report.key),
            UnitOutcome::Preserved(count) => {
                println!("  = {}: no new data, kept {count} stored", report.key);
            }
            UnitOutcome::Empty => println!("  - {}: no data", report.key),
            UnitOutcome::Failed(reason) => println!("  ✗ {}: {reason}", report.key),
        }
    }

    println!();
    println!("{:-<70}", "");
    println!("Fetch complete!");
    println!("  Saved:     {}", summary.persisted());
    println!("  Preserved: {}", summary.preserved());
    println!("  Failed:    {}", summary.failed());
    println!(
        "  Manifest:  {} season(s), {} title(s)",
        summary.manifest.len(),
        summary.manifest.total()
    );

    Ok(())
}
