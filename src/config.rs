use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::archive::DatasetSpec;

pub const APP_NAME: &str = "accident-explorer";
pub const CONFIG_FILE: &str = "config.toml";

/// Manages config directory and config file operations
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Default configuration as TOML text.
    pub fn generate_default_config(&self) -> Result<String> {
        toml::to_string_pretty(&AppConfig::default()).context("serializing default config")
    }

    /// Write the default config file. Refuses to overwrite unless `force`.
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let path = self.config_path();
        if path.exists() && !force {
            bail!(
                "Config file already exists at {}. Use --force to overwrite.",
                path.display()
            );
        }
        std::fs::create_dir_all(&self.config_dir)
            .with_context(|| format!("creating {}", self.config_dir.display()))?;
        std::fs::write(&path, self.generate_default_config()?)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Load `config.toml` from the config directory; defaults when absent.
    pub fn load_config(&self) -> Result<AppConfig> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        AppConfig::from_file(&path)
    }
}

// ---------------------------------------------------------------------------
// Config sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub cache: CacheConfig,
    pub query: QueryConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub id: String,
    /// Remote archive. Only consulted when the extracted file is not cached.
    pub url: Option<String>,
    pub archive_name: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory for downloaded archives. None = the user cache directory.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Entries kept in frequency-ordered distributions.
    pub top_k: usize,
    /// Rows shown in preview tables.
    pub preview_rows: usize,
    /// Hour used when a request does not name one.
    pub default_hour: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            id: "us-accidents-sample-100k".to_string(),
            url: None,
            archive_name: "US_Accidents_sample100k.zip".to_string(),
            file_name: "US_Accidents_sample100k.csv".to_string(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            preview_rows: 5,
            default_hour: 12,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: AppConfig =
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dataset.id.trim().is_empty() {
            bail!("dataset.id must not be empty");
        }
        if self.dataset.archive_name.trim().is_empty() || self.dataset.file_name.trim().is_empty() {
            bail!("dataset.archive_name and dataset.file_name must not be empty");
        }
        if self.query.top_k == 0 {
            bail!("query.top_k must be greater than 0");
        }
        if !(0..24).contains(&self.query.default_hour) {
            bail!("query.default_hour must be between 0 and 23");
        }
        if self.http.timeout_secs == 0 {
            bail!("http.timeout_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn dataset_spec(&self) -> DatasetSpec {
        DatasetSpec {
            id: self.dataset.id.clone(),
            url: self.dataset.url.clone(),
            archive_name: self.dataset.archive_name.clone(),
            file_name: self.dataset.file_name.clone(),
        }
    }

    /// Configured cache directory, else `<user cache dir>/accident-explorer`.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::cache_dir()
                .ok_or_else(|| anyhow!("Could not determine cache directory"))?
                .join(APP_NAME)),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}
