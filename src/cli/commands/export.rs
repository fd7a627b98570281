use crate::config::Config;
use crate::domain::Provider;
use crate::services::export_catalog;
use crate::store::SeasonStore;

pub async fn cmd_export(config: &Config, provider: Provider) -> anyhow::Result<()> {
    let store = SeasonStore::new(config.data_dir(provider));
    let batches = store
        .load_catalog(config.general.start_year..=crate::current_year())
        .await?;

    if batches.is_empty() {
        println!("No stored seasons found in {}", store.root().display());
        println!();
        println!("Fetch some first with: season-tracker fetch --provider {provider}");
        return Ok(());
    }

    let out_dir = config.csv_dir(provider);
    let text_truncate = config.export.text_truncate;
    let report = tokio::task::spawn_blocking(move || {
        export_catalog(&batches, &out_dir, text_truncate)
    })
    .await??;

    println!("Exported {} title(s):", report.records);
    for path in &report.files {
        println!("  {}", path.display());
    }

    Ok(())
}
