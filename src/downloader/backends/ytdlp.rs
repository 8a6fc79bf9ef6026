// Library-backed engine: drives the yt-dlp extractor.
//
// Two phases: a metadata-only extraction (`--dump-json`) for the title, then the
// real transfer. yt-dlp is told to print one machine-readable progress line per
// update, which is adapted into the same percent/rate reports the library's
// progress hook would give.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::downloader::diagnostics::diagnose_error;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadOutcome, DownloadRequest, EngineDescriptor, UrlCheck, VideoInfo};
use crate::downloader::tools::ToolManager;
use crate::downloader::traits::{DownloadEngine, ProgressEmitter};
use crate::downloader::utils::{error_summary, format_rate, run_output};
use crate::logger::Logger;

pub const ENGINE_NAME: &str = "yt-dlp";

/// Playable mp4 among best-quality candidates, else whatever yt-dlp ranks best
pub const FORMAT_SELECTOR: &str = "best[ext=mp4]/best";

const PROGRESS_TAG: &str = "[hikari]";
const PROGRESS_TEMPLATE: &str = "download:[hikari] %(progress.status)s %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.speed)s";

/// One line of `--progress-template` output
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLine {
    pub status: String,
    pub downloaded_bytes: Option<f64>,
    pub total_bytes: Option<f64>,
    pub speed: Option<f64>,
}

impl ProgressLine {
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix(PROGRESS_TAG)?;
        let mut fields = rest.split_whitespace();

        let status = fields.next()?.to_string();
        let number = |field: Option<&str>| field.and_then(|v| v.parse::<f64>().ok());

        Some(Self {
            status,
            downloaded_bytes: number(fields.next()),
            total_bytes: number(fields.next()),
            speed: number(fields.next()),
        })
    }

    /// `(percent, status text)` to report, if this update is reportable.
    /// Updates without a known total are skipped.
    pub fn to_report(&self) -> Option<(f32, String)> {
        match self.status.as_str() {
            "downloading" => {
                let total = self.total_bytes.filter(|t| *t > 0.0)?;
                let downloaded = self.downloaded_bytes.unwrap_or(0.0);
                let percent = (downloaded / total * 100.0) as f32;
                Some((
                    percent,
                    format!("Downloading... {:.1}%{}", percent, format_rate(self.speed)),
                ))
            }
            "finished" => Some((100.0, "Processing download...".to_string())),
            _ => None,
        }
    }
}

pub struct YtDlpEngine {
    descriptor: EngineDescriptor,
    binary: String,
    logger: Logger,
}

impl YtDlpEngine {
    pub fn new(logger: Logger) -> Self {
        Self {
            descriptor: EngineDescriptor::new(
                ENGINE_NAME,
                "Advanced downloader with best compatibility",
                &[
                    "Highest success rate",
                    "Multiple quality options",
                    "Regular updates",
                    "Supports watermark removal",
                ],
                true,
            ),
            binary: ToolManager::new().ytdlp_command(),
            logger,
        }
    }

    /// Use a specific yt-dlp executable
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn metadata_args(url: &str) -> Vec<String> {
        vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            url.to_string(),
        ]
    }

    fn download_args(request: &DownloadRequest) -> Vec<String> {
        let template = request.output_dir.join("%(title)s.%(ext)s");
        vec![
            "-f".to_string(),
            FORMAT_SELECTOR.to_string(),
            "--no-playlist".to_string(),
            "--no-write-subs".to_string(),
            "--no-write-auto-subs".to_string(),
            "--abort-on-error".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "-o".to_string(),
            template.to_string_lossy().to_string(),
            request.url.clone(),
        ]
    }

    /// Failure text with the diagnosed cause appended
    fn describe_failure(&self, stderr: &str) -> String {
        let summary = error_summary(stderr);
        match diagnose_error(stderr) {
            Some(hint) => {
                self.logger.warning(format!(
                    "[{}] {} (transient: {}). {}",
                    ENGINE_NAME,
                    hint.description(),
                    hint.is_transient(),
                    hint.suggestion()
                ));
                format!("{} [{}]", summary, hint.description())
            }
            None => summary,
        }
    }

    /// Metadata-only extraction
    async fn extract_info(&self, url: &str) -> Result<VideoInfo, DownloadError> {
        let output = run_output(&self.binary, Self::metadata_args(url))
            .await
            .map_err(DownloadError::ToolNotFound)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::Resolution(self.describe_failure(&stderr)));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        Ok(VideoInfo {
            id: json["id"].as_str().unwrap_or("").to_string(),
            title: json["title"].as_str().unwrap_or("Unknown").to_string(),
            uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
        })
    }

    async fn fetch(&self, request: &DownloadRequest, emitter: &ProgressEmitter) -> Result<(), DownloadError> {
        let args = Self::download_args(request);
        tracing::debug!("[{}] {} {}", ENGINE_NAME, self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloadError::ToolNotFound(format!("Failed to start {}: {}", self.binary, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Transfer("Failed to capture stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Transfer("Failed to capture stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        // Titles may arrive in a non-UTF-8 console encoding
        let mut reader = BufReader::new(stdout);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw).await? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end();
            match ProgressLine::parse(line) {
                Some(update) => {
                    if let Some((percent, status)) = update.to_report() {
                        emitter.progress(percent);
                        emitter.status(status);
                    }
                }
                None => tracing::debug!("[yt-dlp] {}", line),
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(DownloadError::Resolution(format!(
                "Download failed: {}",
                self.describe_failure(&stderr)
            )))
        }
    }

    async fn run(&self, request: &DownloadRequest, emitter: &ProgressEmitter) -> Result<String, DownloadError> {
        emitter.status("Extracting video information...");
        let info = self
            .extract_info(&request.url)
            .await
            .map_err(|e| DownloadError::Resolution(format!("Download failed: {}", e)))?;
        self.logger.info(format!(
            "[{}] {} by {} (ID: {})",
            ENGINE_NAME, info.title, info.uploader, info.id
        ));

        emitter.status(format!("Downloading: {}", info.title));
        self.fetch(request, emitter).await?;

        emitter.status("Download completed successfully!");
        Ok("Download completed successfully".to_string())
    }
}

#[async_trait]
impl DownloadEngine for YtDlpEngine {
    fn info(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    /// Network-dependent: asks the extractor itself
    async fn validate_url(&self, url: &str) -> UrlCheck {
        match self.extract_info(url).await {
            Ok(info) => UrlCheck::valid(info.title),
            Err(e) => UrlCheck::invalid(e.user_message()),
        }
    }

    async fn download(&self, request: &DownloadRequest, emitter: ProgressEmitter) -> DownloadOutcome {
        let outcome: DownloadOutcome = self.run(request, &emitter).await.into();
        if let DownloadOutcome::Failure { message } = &outcome {
            emitter.status(message.clone());
        }
        outcome
    }
}
