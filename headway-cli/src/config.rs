use anyhow::{bail, Context, Result};
use headway::clock::DEFAULT_TIMEZONE;
use headway::normalize::ColumnMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadwayConfig {
    /// IANA zone the schedule times are expressed in, e.g. "America/Fortaleza"
    pub timezone: String,
    /// Where session state is kept. Defaults to the platform data directory.
    pub state_dir: Option<PathBuf>,
    /// Fallback log filter when RUST_LOG is unset
    pub log_level: String,
    /// Field separator for .csv and .txt files
    pub csv_delimiter: String,
    /// Source column names
    pub columns: ColumnMap,
}

impl Default for HeadwayConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            state_dir: None,
            log_level: "warn".to_string(),
            csv_delimiter: ",".to_string(),
            columns: ColumnMap::default(),
        }
    }
}

impl HeadwayConfig {
    pub fn config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Cannot determine config directory")?
            .join("headway")
            .join("config.toml"))
    }

    /// Defaults, then the config file if present, then `HEADWAY__*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("HEADWAY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read config at {}", path.display()))?;

        let config: Self = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        config.delimiter()?;
        Ok(config)
    }

    /// Writes the default config unless a file already exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::data_dir()
                .context("Cannot determine data directory")?
                .join("headway")),
        }
    }

    pub fn delimiter(&self) -> Result<u8> {
        match self.csv_delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => bail!(
                "csv_delimiter must be a single ASCII character, got {:?}",
                self.csv_delimiter
            ),
        }
    }
}
