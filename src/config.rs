use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the dump CSV files live. Every lookup opens these paths fresh, so
/// the config is cheap to clone around.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub data_dir: PathBuf,
    pub objects_file: String,
    pub funding_rounds_file: String,
    pub people_file: String,
    pub relationships_file: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            objects_file: "objects.csv".to_string(),
            funding_rounds_file: "funding_rounds.csv".to_string(),
            people_file: "people.csv".to_string(),
            relationships_file: "relationships.csv".to_string(),
        }
    }
}

impl DatasetConfig {
    /// Load from `config.toml` when present, otherwise fall back to the
    /// conventional `data/` layout.
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        if !Path::new(config_path).exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(config_path)?;
        let config: DatasetConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn objects_path(&self) -> PathBuf {
        self.data_dir.join(&self.objects_file)
    }

    pub fn funding_rounds_path(&self) -> PathBuf {
        self.data_dir.join(&self.funding_rounds_file)
    }

    pub fn people_path(&self) -> PathBuf {
        self.data_dir.join(&self.people_file)
    }

    pub fn relationships_path(&self) -> PathBuf {
        self.data_dir.join(&self.relationships_file)
    }
}
