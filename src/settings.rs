//! Persisted user choices (`settings.json`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::downloader::backends::{is_known_engine, DEFAULT_ENGINE};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::Quality;
use crate::logger::Logger;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub last_output_dir: PathBuf,
    pub engine: String,
    pub quality: Quality,
}

// Every key is optional on disk
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    last_output_dir: Option<PathBuf>,
    engine: Option<String>,
    quality: Option<String>,
}

pub struct SettingsStore {
    path: PathBuf,
    default_output_dir: PathBuf,
    logger: Logger,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>, default_output_dir: impl Into<PathBuf>, logger: Logger) -> Self {
        Self {
            path: path.into(),
            default_output_dir: default_output_dir.into(),
            logger,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_output_dir(&self) -> &Path {
        &self.default_output_dir
    }

    pub fn defaults(&self) -> Settings {
        Settings {
            last_output_dir: self.default_output_dir.clone(),
            engine: DEFAULT_ENGINE.to_string(),
            quality: Quality::Best,
        }
    }

    /// Never fails: a missing or corrupt file yields defaults
    pub fn load(&self) -> Settings {
        let raw = match self.read_raw() {
            Ok(Some(raw)) => raw,
            Ok(None) => RawSettings::default(),
            Err(e) => {
                self.logger.warning(format!("Could not load settings: {}", e));
                RawSettings::default()
            }
        };

        let last_output_dir = raw
            .last_output_dir
            .filter(|dir| dir.exists())
            .unwrap_or_else(|| self.default_output_dir.clone());

        let engine = match raw.engine {
            Some(name) if is_known_engine(&name) => name,
            Some(name) => {
                self.logger.warning(format!(
                    "Unknown engine '{}' in settings, using {}",
                    name, DEFAULT_ENGINE
                ));
                DEFAULT_ENGINE.to_string()
            }
            None => DEFAULT_ENGINE.to_string(),
        };

        let quality = raw
            .quality
            .and_then(|q| q.parse::<Quality>().ok())
            .unwrap_or_default();

        Settings {
            last_output_dir,
            engine,
            quality,
        }
    }

    fn read_raw(&self) -> Result<Option<RawSettings>, DownloadError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, settings: &Settings) -> Result<(), DownloadError> {
        let result = serde_json::to_string_pretty(settings)
            .map_err(DownloadError::from)
            .and_then(|json| std::fs::write(&self.path, json).map_err(DownloadError::from));

        match result {
            Ok(()) => {
                self.logger.debug("Settings saved successfully");
                Ok(())
            }
            Err(e) => {
                self.logger.warning(format!("Could not save settings: {}", e));
                Err(DownloadError::Configuration(format!(
                    "Could not save settings: {}",
                    e
                )))
            }
        }
    }
}
