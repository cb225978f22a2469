use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::card::CardColor;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Cardbox";
const APP_NAME: &str = "cardbox";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths);
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("CARDBOX_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("CARDBOX_DATA").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let snapshot_path = data_root.join("cards.json");

        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));
        let log_dir = state_dir.join("logs");

        Ok(Self {
            config_dir,
            config_file,
            data_dir: data_root,
            snapshot_path,
            state_dir,
            log_dir,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.state_dir, &self.log_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub theme: ThemeName,
    /// Palette color assigned to cards created without an explicit choice.
    pub default_color: CardColor,
    pub storage: StorageOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: ThemeName::Dark,
            default_color: CardColor::default(),
            storage: StorageOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) {
        self.storage.resolve(paths);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(skip)]
    pub snapshot_path: PathBuf,
    /// Skip the snapshot file entirely; the board lives only for the session.
    #[serde(skip)]
    pub ephemeral: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::new(),
            ephemeral: false,
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) {
        if self.snapshot_path.as_os_str().is_empty() {
            self.snapshot_path = paths.snapshot_path.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    Dark,
    Light,
}

impl Default for ThemeName {
    fn default() -> Self {
        ThemeName::Dark
    }
}
