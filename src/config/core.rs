use super::chunksys::ChunkSysConfig;
use super::worldgen::WorldGenConfig;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub chunksys: ChunkSysConfig,
    #[serde(default)]
    pub worldgen: WorldGenConfig,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Reads the config at `path`, writing the defaults there first if it is missing.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        if !path.exists() {
            let default_config = EngineConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            std::fs::write(path, toml_content).context("Failed to write default config")?;
            return Ok(default_config);
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        Self::from_toml_str(&content)
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "MetroManDevTeam", "Blokstream")
        .context("Couldn't determine project directory")?;
    Ok(proj_dirs.config_dir().join("engine.toml"))
}
