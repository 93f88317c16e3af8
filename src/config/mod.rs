use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Per-user directories; `None` on systems without a home directory, in
/// which case paths fall back to the working directory.
pub static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("org", "VerseFind", "versefind"));

pub static CONFIG_DIR: Lazy<PathBuf> = Lazy::new(|| {
    PROJECT_DIRS
        .as_ref()
        .map_or_else(|| PathBuf::from("."), |dirs| dirs.config_dir().to_path_buf())
});

/// Home of the default log file.
pub static CACHE_DIR: Lazy<PathBuf> = Lazy::new(|| {
    PROJECT_DIRS
        .as_ref()
        .map_or_else(|| PathBuf::from("."), |dirs| dirs.cache_dir().to_path_buf())
});

pub const MIN_WRAP_WIDTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bible_path: PathBuf,
    pub abbreviations_path: PathBuf,
    pub verses_path: PathBuf,
    pub wrap_width: usize,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bible_path: PathBuf::from("bible.txt"),
            abbreviations_path: PathBuf::from("abbreviations.csv"),
            verses_path: PathBuf::from("verses.txt"),
            wrap_width: 80,
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Loads the file named on the command line, else the per-user config
    /// file if one exists, else defaults; then applies command-line overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(cli);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(content)?;
        config.wrap_width = config.wrap_width.max(MIN_WRAP_WIDTH);
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        CONFIG_DIR.join("config.toml")
    }

    /// Where log records go; never the terminal.
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| CACHE_DIR.join("versefind.log"))
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(path) = &cli.bible {
            self.bible_path = path.clone();
        }
        if let Some(path) = &cli.abbreviations {
            self.abbreviations_path = path.clone();
        }
        if let Some(path) = &cli.output {
            self.verses_path = path.clone();
        }
        if let Some(width) = cli.width {
            self.wrap_width = width.max(MIN_WRAP_WIDTH);
        }
    }
}
