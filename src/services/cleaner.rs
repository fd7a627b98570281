use tracing::{error, info, warn};

use crate::pipeline::deduplicate;
use crate::store::{ManifestEntry, SeasonStore, StoreError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub files_scanned: usize,
    pub files_cleaned: usize,
    /// Duplicate and undecodable entries removed across all files.
    pub removed: usize,
    pub errors: usize,
}

/// Deduplicates every stored unit in place.
///
/// Files are only rewritten when something was removed; their manifest count
/// follows. A file that cannot be read or written is reported and skipped.
pub async fn clean_store(store: &SeasonStore) -> Result<CleanReport, StoreError> {
    let mut manifest = store.load_manifest().await?;
    let mut report = CleanReport::default();

    for key in store.stored_units().await? {
        report.files_scanned += 1;

        let unit = match store.read_unit(key).await {
            Ok(Some(unit)) => unit,
            Ok(None) => continue,
            Err(e) => {
                warn!(unit = %key, error = %e, "Failed to read {key}");
                report.errors += 1;
                continue;
            }
        };

        let (records, dedup) = deduplicate(unit.records);
        let removed = dedup.removed() + unit.skipped;
        if removed == 0 {
            continue;
        }
        dedup.log(key);

        if let Err(e) = store.save_unit(key, &records).await {
            error!(unit = %key, error = %e, "Failed to rewrite {key}");
            report.errors += 1;
            continue;
        }

        info!(unit = %key, removed, "Cleaned {key}: removed {removed} entr(ies)");
        manifest.upsert(ManifestEntry::new(key, records.len()));
        report.files_cleaned += 1;
        report.removed += removed;
    }

    if report.files_cleaned > 0 {
        store.save_manifest(&manifest).await?;
    }

    Ok(report)
}
