use anyhow::Context;

use crate::config::Config;
use crate::domain::Provider;
use crate::services::clean_store;
use crate::store::SeasonStore;

pub async fn cmd_clean(config: &Config, provider: Provider) -> anyhow::Result<()> {
    let store = SeasonStore::new(config.data_dir(provider));
    println!("Cleaning {}", store.root().display());

    let report = clean_store(&store)
        .await
        .with_context(|| format!("Failed to clean {}", store.root().display()))?;

    println!();
    println!("{:-<70}", "");
    println!("Clean complete!");
    println!("  Scanned: {}", report.files_scanned);
    println!("  Cleaned: {}", report.files_cleaned);
    println!("  Removed: {}", report.removed);
    if report.errors > 0 {
        println!("  Errors:  {}", report.errors);
    }

    Ok(())
}
