use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A lunar month never runs past 30 days.
pub const MAX_RAMADAN_DAYS: u32 = 30;

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 28).unwrap_or_default()
}
fn default_days() -> u32 {
    30
}
fn default_hijri_offset() -> i32 {
    0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Overrides the file under the data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamadanConfig {
    /// 1 Ramadan in the Gregorian calendar.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_days")]
    pub days: u32,
    /// Days to add/subtract from the Hijri date for local moon sighting.
    #[serde(default = "default_hijri_offset")]
    pub hijri_offset: i32,
}

impl Default for RamadanConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            days: default_days(),
            hijri_offset: default_hijri_offset(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ramadan: RamadanConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "amal").context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Where the configured backend keeps its data.
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }
        let file = match self.storage.backend {
            BackendKind::Sqlite => "amal.db",
            BackendKind::Json => "amal.json",
        };
        Ok(Self::data_dir()?.join(file))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
        let config: AppConfig = toml::from_str(&content).context("Parsing config.toml")?;
        if !(1..=MAX_RAMADAN_DAYS).contains(&config.ramadan.days) {
            anyhow::bail!(
                "[ramadan] days must be between 1 and {}, got {}",
                MAX_RAMADAN_DAYS,
                config.ramadan.days
            );
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.storage.backend, BackendKind::Sqlite);
        assert_eq!(config.ramadan.start_date, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        assert_eq!(config.ramadan.days, 30);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\nbackend = \"json\"\n\n[ramadan]\ndays = 29\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.storage.backend, BackendKind::Json);
        assert_eq!(config.storage.path, None);
        assert_eq!(config.ramadan.days, 29);
        assert_eq!(config.ramadan.start_date, default_start_date());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.storage.path = Some(dir.path().join("data.json"));
        config.ramadan.hijri_offset = -1;
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn days_outside_a_lunar_month_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        for days in [0, 31, 2000] {
            std::fs::write(&path, format!("[ramadan]\ndays = {}\n", days)).unwrap();
            assert!(AppConfig::load_from(&path).is_err(), "{}", days);
        }
        std::fs::write(&path, "[ramadan]\ndays = 29\n").unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().ramadan.days, 29);
    }
}
