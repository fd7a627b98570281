use chrono::Local;

use crate::config::Config;
use crate::domain::Provider;
use crate::services::{ChartOptions, write_charts};
use crate::store::SeasonStore;

pub async fn cmd_charts(config: &Config, provider: Provider) -> anyhow::Result<()> {
    let store = SeasonStore::new(config.data_dir(provider));
    let batches = store
        .load_catalog(config.general.start_year..=crate::current_year())
        .await?;

    if batches.is_empty() {
        println!("No stored seasons found in {}", store.root().display());
        return Ok(());
    }

    let options = ChartOptions {
        top_genres: config.export.top_genres,
        top_studios: config.export.top_studios,
        min_rated_for_quality: config.export.min_rated_for_quality,
        popularity_scatter: provider == Provider::Jikan,
    };
    let written = write_charts(&batches, store.root(), options, Local::now().date_naive()).await?;

    println!("Wrote {} chart dataset(s):", written.len());
    for path in &written {
        println!("  {}", path.display());
    }

    Ok(())
}
