//! On-disk season store.
//!
//! Layout under the provider data directory:
//!
//! ```text
//! <root>/manifest.json
//! <root>/<year>/<season>.json
//! ```
//!
//! Every write goes to a sibling temporary file first and is renamed into
//! place, so readers never observe a half-written batch.

pub mod manifest;

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{Season, SeasonKey};
use crate::models::Record;
pub use manifest::{Manifest, ManifestEntry};

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path) -> impl FnOnce(serde_json::Error) -> Self + '_ {
        move |source| Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What happened when a batch was handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The batch replaced whatever was stored for the unit.
    Written(usize),
    /// The batch was empty and an earlier non-empty batch was kept.
    Preserved(usize),
    /// The batch was empty and nothing was stored before.
    Empty,
}

/// Decoded contents of one unit file.
#[derive(Debug, Clone, Default)]
pub struct LoadedUnit {
    pub records: Vec<Record>,
    /// Entries present in the file that could not be decoded.
    pub skipped: usize,
}

/// A stored batch together with its manifest entry.
#[derive(Debug, Clone)]
pub struct StoredBatch {
    pub entry: ManifestEntry,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone)]
pub struct SeasonStore {
    root: PathBuf,
}

impl SeasonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn unit_path(&self, key: SeasonKey) -> PathBuf {
        self.root
            .join(key.year.to_string())
            .join(format!("{}.json", key.season))
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Stored records for `key`, or `None` when the unit was never persisted.
    pub async fn load_unit(&self, key: SeasonKey) -> Result<Option<Vec<Record>>, StoreError> {
        Ok(self.read_unit(key).await?.map(|unit| unit.records))
    }

    /// Like [`Self::load_unit`], also reporting how many entries were dropped.
    ///
    /// Entries written by older tools may lack `year` and `season`; they are
    /// filled in from the file location. Entries that still fail to decode
    /// (no identifier, for instance) are skipped with a warning.
    pub async fn read_unit(&self, key: SeasonKey) -> Result<Option<LoadedUnit>, StoreError> {
        let path = self.unit_path(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path)(e)),
        };

        let values: Vec<Value> = serde_json::from_str(&content).map_err(StoreError::json(&path))?;
        let mut records = Vec::with_capacity(values.len());
        let mut skipped = 0usize;

        for mut value in values {
            if let Value::Object(map) = &mut value {
                if map.get("year").is_none_or(Value::is_null) {
                    map.insert("year".to_string(), Value::from(key.year));
                }
                if map.get("season").is_none_or(Value::is_null) {
                    map.insert("season".to_string(), Value::from(key.season.as_str()));
                }
            }

            match serde_json::from_value::<Record>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    debug!(path = %path.display(), error = %e, "Undecodable entry");
                }
            }
        }

        if skipped > 0 {
            warn!(
                path = %path.display(),
                skipped,
                "Skipped {} stored entr(ies) that could not be decoded",
                skipped
            );
        }

        Ok(Some(LoadedUnit { records, skipped }))
    }

    /// Replaces the stored batch for `key`.
    pub async fn save_unit(&self, key: SeasonKey, records: &[Record]) -> Result<(), StoreError> {
        let path = self.unit_path(key);
        let bytes = serde_json::to_vec_pretty(records).map_err(StoreError::json(&path))?;
        write_atomic(&path, &bytes).await
    }

    /// Writes `records` unless the batch is empty. An empty batch never
    /// replaces data already on disk.
    pub async fn persist(
        &self,
        key: SeasonKey,
        records: &[Record],
    ) -> Result<PersistOutcome, StoreError> {
        if !records.is_empty() {
            self.save_unit(key, records).await?;
            return Ok(PersistOutcome::Written(records.len()));
        }

        match self.load_unit(key).await? {
            Some(existing) if !existing.is_empty() => Ok(PersistOutcome::Preserved(existing.len())),
            _ => Ok(PersistOutcome::Empty),
        }
    }

    /// Loads the manifest. A missing file is an empty manifest; a corrupt one
    /// is reported and treated as empty so it can be rebuilt.
    pub async fn load_manifest(&self) -> Result<Manifest, StoreError> {
        let path = self.manifest_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Manifest::default()),
            Err(e) => return Err(StoreError::io(&path)(e)),
        };

        match serde_json::from_str(&content) {
            Ok(manifest) => Ok(manifest),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not parse manifest, starting fresh");
                Ok(Manifest::default())
            }
        }
    }

    pub async fn save_manifest(&self, manifest: &Manifest) -> Result<(), StoreError> {
        let path = self.manifest_path();
        let bytes = serde_json::to_vec_pretty(manifest).map_err(StoreError::json(&path))?;
        write_atomic(&path, &bytes).await
    }

    /// Every unit file on disk, in chronological order.
    ///
    /// Only all-digit directories are treated as years and only
    /// `<season>.json` files as units.
    pub async fn stored_units(&self) -> Result<Vec<SeasonKey>, StoreError> {
        let mut units = Vec::new();

        let mut years = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(units),
            Err(e) => return Err(StoreError::io(&self.root)(e)),
        };

        while let Some(entry) = years.next_entry().await.map_err(StoreError::io(&self.root))? {
            let name = entry.file_name();
            let Some(year) = name
                .to_str()
                .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
                .and_then(|n| n.parse::<i32>().ok())
            else {
                continue;
            };

            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }

            let mut files = tokio::fs::read_dir(&dir).await.map_err(StoreError::io(&dir))?;
            while let Some(file) = files.next_entry().await.map_err(StoreError::io(&dir))? {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Some(season) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse::<Season>().ok())
                {
                    units.push(SeasonKey::new(year, season));
                }
            }
        }

        units.sort_unstable();
        units.dedup();
        Ok(units)
    }

    /// Stored batches listed in the manifest for `years`, oldest first.
    ///
    /// Manifest entries whose file has gone missing are skipped.
    pub async fn load_catalog(
        &self,
        years: RangeInclusive<i32>,
    ) -> Result<Vec<StoredBatch>, StoreError> {
        let manifest = self.load_manifest().await?;
        let mut batches = Vec::new();

        for entry in manifest.entries() {
            if !years.contains(&entry.year) {
                continue;
            }
            if let Some(records) = self.load_unit(entry.key()).await? {
                batches.push(StoredBatch {
                    entry: *entry,
                    records,
                });
            } else {
                warn!(unit = %entry.key(), "Manifest entry has no data file");
            }
        }

        Ok(batches)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(StoreError::io(parent))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(StoreError::io(&tmp))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(StoreError::io(path))?;
    Ok(())
}
