use serde::{Deserialize, Serialize};

use crate::domain::{Season, SeasonKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub year: i32,
    pub season: Season,
    pub count: usize,
}

impl ManifestEntry {
    #[must_use]
    pub const fn new(key: SeasonKey, count: usize) -> Self {
        Self {
            year: key.year,
            season: key.season,
            count,
        }
    }

    #[must_use]
    pub const fn key(&self) -> SeasonKey {
        SeasonKey::new(self.year, self.season)
    }
}

/// Index of persisted batches, one entry per unit, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ManifestEntry>", into = "Vec<ManifestEntry>")]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl From<Vec<ManifestEntry>> for Manifest {
    fn from(entries: Vec<ManifestEntry>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<Manifest> for Vec<ManifestEntry> {
    fn from(manifest: Manifest) -> Self {
        manifest.entries
    }
}

impl Manifest {
    /// Builds a manifest from arbitrary entries; the last entry wins for
    /// repeated keys.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = ManifestEntry>) -> Self {
        let mut manifest = Self::default();
        for entry in entries {
            manifest.upsert(entry);
        }
        manifest
    }

    pub fn upsert(&mut self, entry: ManifestEntry) {
        match self.entries.binary_search_by_key(&entry.key(), ManifestEntry::key) {
            Ok(index) => self.entries[index] = entry,
            Err(index) => self.entries.insert(index, entry),
        }
    }

    pub fn remove(&mut self, key: SeasonKey) -> Option<ManifestEntry> {
        let index = self
            .entries
            .binary_search_by_key(&key, ManifestEntry::key)
            .ok()?;
        Some(self.entries.remove(index))
    }

    #[must_use]
    pub fn get(&self, key: SeasonKey) -> Option<&ManifestEntry> {
        self.entries
            .binary_search_by_key(&key, ManifestEntry::key)
            .ok()
            .map(|index| &self.entries[index])
    }

    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(year: i32, season: Season, count: usize) -> ManifestEntry {
        ManifestEntry::new(SeasonKey::new(year, season), count)
    }

    #[test]
    fn test_upsert_keeps_one_entry_per_key_in_order() {
        let mut manifest = Manifest::default();
        manifest.upsert(entry(2024, Season::Fall, 10));
        manifest.upsert(entry(2023, Season::Spring, 5));
        manifest.upsert(entry(2024, Season::Winter, 7));
        manifest.upsert(entry(2024, Season::Fall, 12));

        let keys: Vec<_> = manifest.entries().iter().map(|e| (e.year, e.season, e.count)).collect();
        assert_eq!(
            keys,
            vec![
                (2023, Season::Spring, 5),
                (2024, Season::Winter, 7),
                (2024, Season::Fall, 12),
            ]
        );
        assert_eq!(manifest.total(), 24);
    }

    #[test]
    fn test_from_unsorted_json() {
        let json = r#"[
            {"year": 2025, "season": "summer", "count": 3},
            {"year": 2006, "season": "winter", "count": 40},
            {"year": 2025, "season": "summer", "count": 4}
        ]"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entries()[0].year, 2006);
        assert_eq!(manifest.get(SeasonKey::new(2025, Season::Summer)).unwrap().count, 4);
    }

    #[test]
    fn test_remove() {
        let mut manifest = Manifest::from_entries([entry(2020, Season::Spring, 1)]);
        assert!(manifest.remove(SeasonKey::new(2020, Season::Fall)).is_none());
        assert!(manifest.remove(SeasonKey::new(2020, Season::Spring)).is_some());
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let manifest = Manifest::from_entries([entry(2021, Season::Fall, 2)]);
        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(json, r#"[{"year":2021,"season":"fall","count":2}]"#);
    }
}
