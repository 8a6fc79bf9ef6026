//! Install-relative locations.

use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone)]
pub struct AppPaths {
    install_dir: PathBuf,
}

impl AppPaths {
    /// Rooted at `home` when given, else at the directory holding the executable
    pub fn resolve(home: Option<PathBuf>) -> Self {
        let install_dir = home.unwrap_or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        Self { install_dir }
    }

    pub fn at(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn settings_file(&self) -> PathBuf {
        self.install_dir.join(SETTINGS_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.install_dir.join("logs")
    }

    /// `<install>/Downloads`, created if missing. Falls back to the current
    /// working directory when it cannot be created.
    pub fn default_downloads_dir(&self) -> PathBuf {
        let dir = self.install_dir.join("Downloads");
        match std::fs::create_dir_all(&dir) {
            Ok(()) => dir,
            Err(e) => {
                tracing::warn!("Could not create {}: {}", dir.display(), e);
                std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
            }
        }
    }
}
