use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::domain::Provider;
use crate::pipeline::{GenreTables, HeuristicTables, OriginPolicyKind, PipelineConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub jikan: JikanConfig,

    pub bangumi: BangumiConfig,

    pub heuristics: HeuristicTables,

    pub genres: GenreTables,

    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// First year covered by full-history fetches and by exported statistics.
    pub start_year: i32,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            start_year: 2006,
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JikanConfig {
    pub base_url: String,

    pub data_dir: String,

    pub user_agent: String,

    pub request_timeout_seconds: u64,

    /// Pause between season pages.
    pub page_delay_ms: u64,

    /// Pause between (year, season) units.
    pub unit_delay_ms: u64,

    /// Broadcast formats kept; everything else (movies, OVAs, ...) is skipped.
    pub allowed_formats: Vec<String>,

    pub origin_policy: OriginPolicyKind,
}

impl Default for JikanConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.jikan.moe/v4".to_string(),
            data_dir: "data".to_string(),
            user_agent: "season-tracker/0.1".to_string(),
            request_timeout_seconds: 30,
            page_delay_ms: 2000,
            unit_delay_ms: 2000,
            allowed_formats: vec!["TV".to_string()],
            origin_policy: OriginPolicyKind::StudioAllowList,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BangumiConfig {
    pub api_base_url: String,

    pub browser_base_url: String,

    pub data_dir: String,

    pub user_agent: String,

    pub request_timeout_seconds: u64,

    /// Pause between browser listing pages.
    pub page_delay_ms: u64,

    /// Pause between subject detail requests.
    pub detail_delay_ms: u64,

    /// Pause between season units.
    pub unit_delay_ms: u64,

    pub origin_policy: OriginPolicyKind,
}

impl Default for BangumiConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.bgm.tv".to_string(),
            browser_base_url: "https://bgm.tv".to_string(),
            data_dir: "data_cn".to_string(),
            user_agent: "season-tracker/0.1 (https://github.com/season-tracker)".to_string(),
            request_timeout_seconds: 30,
            page_delay_ms: 500,
            detail_delay_ms: 500,
            unit_delay_ms: 500,
            origin_policy: OriginPolicyKind::KanaDetection,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// CSV output directory, relative to the provider data directory.
    pub csv_dir: String,

    /// Maximum characters kept from long text fields in CSV rows.
    pub text_truncate: usize,

    /// Number of genres plotted in trend datasets.
    pub top_genres: usize,

    /// Number of studios listed in each ranking.
    pub top_studios: usize,

    /// Rated titles a studio needs before it is ranked by quality.
    pub min_rated_for_quality: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_dir: "csv".to_string(),
            text_truncate: 200,
            top_genres: 10,
            top_studios: 15,
            min_rated_for_quality: 10,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("season-tracker").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".season-tracker").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.jikan.base_url.is_empty() {
            anyhow::bail!("Jikan base URL cannot be empty");
        }

        if self.bangumi.api_base_url.is_empty() || self.bangumi.browser_base_url.is_empty() {
            anyhow::bail!("Bangumi URLs cannot be empty");
        }

        let latest = crate::current_year() + 1;
        if self.general.start_year > latest {
            anyhow::bail!(
                "start_year {} is after the last fetchable year {latest}",
                self.general.start_year
            );
        }

        if self.genres.vocabulary.is_empty() {
            anyhow::bail!("Genre vocabulary cannot be empty");
        }

        Ok(())
    }

    #[must_use]
    pub fn data_dir(&self, provider: Provider) -> PathBuf {
        match provider {
            Provider::Jikan => PathBuf::from(&self.jikan.data_dir),
            Provider::Bangumi => PathBuf::from(&self.bangumi.data_dir),
        }
    }

    #[must_use]
    pub fn csv_dir(&self, provider: Provider) -> PathBuf {
        self.data_dir(provider).join(&self.export.csv_dir)
    }

    /// Delay between (year, season) units for `provider`.
    #[must_use]
    pub const fn unit_delay(&self, provider: Provider) -> Duration {
        match provider {
            Provider::Jikan => Duration::from_millis(self.jikan.unit_delay_ms),
            Provider::Bangumi => Duration::from_millis(self.bangumi.unit_delay_ms),
        }
    }

    /// Pipeline settings for batches fetched from `provider`.
    #[must_use]
    pub fn pipeline(&self, provider: Provider) -> PipelineConfig {
        let (policy, normalize_tags, allowed_formats) = match provider {
            Provider::Jikan => (
                self.jikan.origin_policy,
                false,
                self.jikan.allowed_formats.clone(),
            ),
            Provider::Bangumi => (self.bangumi.origin_policy, true, Vec::new()),
        };

        PipelineConfig {
            policy,
            normalize_tags,
            allowed_formats,
            heuristics: self.heuristics.clone(),
            genres: self.genres.clone(),
        }
    }
}
