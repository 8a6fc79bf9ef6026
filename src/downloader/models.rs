// Common data models for downloader

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::errors::DownloadError;

/// Static description of an engine, shown in the engine info panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineDescriptor {
    pub name: String,
    pub description: String,
    pub advantages: Vec<String>,
    pub recommended: bool,
}

impl EngineDescriptor {
    pub fn new(name: &str, description: &str, advantages: &[&str], recommended: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            advantages: advantages.iter().map(|a| a.to_string()).collect(),
            recommended,
        }
    }

    /// Multi-line summary in the same shape as the engine info dialog
    pub fn summary(&self) -> String {
        let recommended = if self.recommended { " (Recommended)" } else { "" };
        format!(
            "{}{}\n\nAdvantages:\n• {}",
            self.description,
            recommended,
            self.advantages.join("\n• ")
        )
    }
}

/// Requested output quality. Only `best` exists for now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Best,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Best => "best",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "best" => Ok(Self::Best),
            other => Err(DownloadError::Configuration(format!(
                "Unsupported quality: {}",
                other
            ))),
        }
    }
}

/// One user-initiated download
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub quality: Quality,
    pub engine: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>, engine: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            quality: Quality::Best,
            engine: engine.into(),
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }
}

/// Terminal value of one fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success { message: String },
    Failure { message: String },
}

impl DownloadOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success { message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure { message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success { message } | Self::Failure { message } => message,
        }
    }
}

impl From<Result<String, DownloadError>> for DownloadOutcome {
    fn from(result: Result<String, DownloadError>) -> Self {
        match result {
            Ok(message) => Self::Success { message },
            Err(e) => Self::Failure { message: e.user_message() },
        }
    }
}

/// Percent complete, nominally in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub percent: f32,
}

impl ProgressEvent {
    pub fn new(percent: f32) -> Self {
        Self {
            percent: percent.clamp(0.0, 100.0),
        }
    }
}

/// Human-readable status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub text: String,
}

/// Everything an engine can report while it works
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress(ProgressEvent),
    Status(StatusEvent),
}

/// Result of a URL validity check: `(is_valid, message)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlCheck {
    pub valid: bool,
    pub message: String,
}

impl UrlCheck {
    pub fn valid(message: impl Into<String>) -> Self {
        Self { valid: true, message: message.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self { valid: false, message: message.into() }
    }
}

/// Metadata resolved before a transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub uploader: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_parses_only_best() {
        assert_eq!("best".parse::<Quality>().unwrap(), Quality::Best);
        assert_eq!(" BEST ".parse::<Quality>().unwrap(), Quality::Best);
        assert!("1080p".parse::<Quality>().is_err());
        assert_eq!(serde_json::to_string(&Quality::Best).unwrap(), "\"best\"");
    }

    #[test]
    fn outcome_from_result() {
        let ok: DownloadOutcome = Ok::<_, DownloadError>("done".to_string()).into();
        assert!(ok.is_success());
        assert_eq!(ok.message(), "done");

        let err: DownloadOutcome =
            Err::<String, _>(DownloadError::Resolution("Could not get download URL".into())).into();
        assert!(!err.is_success());
        assert_eq!(err.message(), "Could not get download URL");
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(ProgressEvent::new(130.0).percent, 100.0);
        assert_eq!(ProgressEvent::new(-1.0).percent, 0.0);
    }

    #[test]
    fn descriptor_summary_marks_recommended() {
        let d = EngineDescriptor::new("yt-dlp", "Advanced downloader", &["A", "B"], true);
        assert_eq!(d.summary(), "Advanced downloader (Recommended)\n\nAdvantages:\n• A\n• B");
    }
}
