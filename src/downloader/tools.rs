use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

/// Environment variable that pins the yt-dlp binary
pub const YTDLP_ENV: &str = "HIKARI_YTDLP";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

pub struct ToolManager;

impl ToolManager {
    pub fn new() -> Self {
        Self
    }

    pub fn ytdlp_info(&self) -> ToolInfo {
        let path = self.locate_ytdlp();
        let version = path.as_deref().and_then(|p| self.get_version(p));

        ToolInfo {
            name: "yt-dlp".to_string(),
            is_available: version.is_some(),
            version,
            path,
        }
    }

    /// Binary to invoke: located path, or the bare name for a PATH lookup at spawn time
    pub fn ytdlp_command(&self) -> String {
        self.locate_ytdlp().unwrap_or_else(|| binary_name().to_string())
    }

    fn locate_ytdlp(&self) -> Option<String> {
        // 1. Explicit override
        if let Ok(path) = std::env::var(YTDLP_ENV) {
            if !path.trim().is_empty() {
                return Some(path);
            }
        }

        // 2. Common install locations
        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary_name()),
            format!("/usr/local/bin/{}", binary_name()),
            format!("/usr/bin/{}", binary_name()),
        ];
        if let Some(found) = common_paths.into_iter().find(|p| Path::new(p).exists()) {
            return Some(found);
        }

        // 3. PATH
        let lookup = if cfg!(windows) { "where" } else { "which" };
        match Command::new(lookup).arg(binary_name()).output() {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            _ => None,
        }
    }

    fn get_version(&self, path: &str) -> Option<String> {
        match Command::new(path).arg("--version").output() {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            _ => None,
        }
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

fn binary_name() -> &'static str {
    if cfg!(windows) {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    }
}
