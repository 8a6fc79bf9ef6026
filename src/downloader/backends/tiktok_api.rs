// Direct platform API engine.
//
// Resolution is a placeholder: no real TikTok endpoint is called. The metadata
// record is synthesized from the identifier and points at a fabricated media
// URL, so downloads through this engine are expected to fail in practice. The
// transfer half is real and streams whatever the resolved URL serves.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{
    DownloadOutcome, DownloadRequest, EngineDescriptor, Quality, UrlCheck, VideoInfo,
};
use crate::downloader::traits::{DownloadEngine, ProgressEmitter};
use crate::downloader::utils::safe_filename;
use crate::downloader::validator::UrlValidator;
use crate::logger::Logger;

pub const ENGINE_NAME: &str = "tiktok-api";

const PLACEHOLDER_MEDIA_BASE: &str = "https://example.com/video";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/91.0.4472.124";

/// Bytes written (and reported) per step
const CHUNK_SIZE: usize = 8192;

/// Synthetic metadata keyed by identifier
#[derive(Debug, Clone)]
struct VideoRecord {
    info: VideoInfo,
    download_urls: HashMap<String, String>,
}

pub struct TikTokApiEngine {
    descriptor: EngineDescriptor,
    validator: UrlValidator,
    client: reqwest::Client,
    media_base: String,
    logger: Logger,
}

impl TikTokApiEngine {
    pub fn new(logger: Logger) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            descriptor: EngineDescriptor::new(
                ENGINE_NAME,
                "Direct API access for faster downloads",
                &[
                    "Faster download speed",
                    "Lower resource usage",
                    "Direct API access",
                    "Lightweight",
                ],
                false,
            ),
            validator: UrlValidator::new(),
            client,
            media_base: PLACEHOLDER_MEDIA_BASE.to_string(),
            logger,
        }
    }

    /// Serve resolved media from `base` instead of the placeholder host
    pub fn with_media_base(mut self, base: impl Into<String>) -> Self {
        self.media_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn lookup_record(&self, video_id: &str) -> VideoRecord {
        let mut download_urls = HashMap::new();
        download_urls.insert(
            Quality::Best.as_str().to_string(),
            format!("{}/{}.mp4", self.media_base, video_id),
        );

        VideoRecord {
            info: VideoInfo {
                id: video_id.to_string(),
                title: format!("TikTok_Video_{}", video_id),
                uploader: "Unknown".to_string(),
            },
            download_urls,
        }
    }

    // Every quality resolves to the best entry
    fn select_download_url(record: &VideoRecord, _quality: Quality) -> Option<&str> {
        record
            .download_urls
            .get(Quality::Best.as_str())
            .map(String::as_str)
    }

    async fn run(&self, request: &DownloadRequest, emitter: &ProgressEmitter) -> Result<String, DownloadError> {
        emitter.status("Extracting video information...");

        let video_id = self
            .validator
            .extract_id(&request.url)
            .ok_or_else(|| DownloadError::Resolution("Could not extract video ID from URL".to_string()))?;

        let record = self.lookup_record(&video_id);
        let media_url = Self::select_download_url(&record, request.quality)
            .ok_or_else(|| DownloadError::Resolution("Could not get download URL".to_string()))?;

        let info = &record.info;
        self.logger.info(format!(
            "[{}] {} by {} (ID: {})",
            ENGINE_NAME, info.title, info.uploader, info.id
        ));

        let path = request.output_dir.join(safe_filename(&record.info.title));
        emitter.status(format!("Downloading: {}", record.info.title));
        self.logger.debug(format!("[{}] {} -> {}", ENGINE_NAME, media_url, path.display()));

        let bytes = self.transfer(media_url, &path, emitter).await?;
        self.logger.debug(format!("[{}] wrote {} bytes", ENGINE_NAME, bytes));

        emitter.status("Download completed successfully!");
        Ok("Download completed successfully".to_string())
    }

    /// Stream `url` into `path`. Progress is only reported when the server
    /// announces a content length. A partial file is left behind on failure.
    async fn transfer(&self, url: &str, path: &Path, emitter: &ProgressEmitter) -> Result<u64, DownloadError> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let total = response.content_length().unwrap_or(0);

        let mut file = tokio::fs::File::create(path).await?;
        let mut downloaded: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            for piece in chunk.chunks(CHUNK_SIZE) {
                file.write_all(piece).await?;
                downloaded += piece.len() as u64;

                if total > 0 {
                    let percent = (downloaded as f64 / total as f64 * 100.0) as f32;
                    emitter.progress(percent);
                    emitter.status(format!("Downloading... {:.1}%", percent));
                }
            }
        }

        file.flush().await?;
        Ok(downloaded)
    }
}

#[async_trait]
impl DownloadEngine for TikTokApiEngine {
    fn info(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    async fn validate_url(&self, url: &str) -> UrlCheck {
        match self.validator.extract_id(url) {
            Some(id) => UrlCheck::valid(format!("TikTok video detected (ID: {})", id)),
            None => UrlCheck::invalid("Invalid TikTok URL format"),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::EngineEvent;
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Answer exactly one HTTP request with `status` and `body`
    async fn serve_once(status: &'static str, body: Vec<u8>, with_length: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
            if with_length {
                head.push_str(&format!("Content-Length: {}\r\n", body.len()));
            }
            head.push_str("\r\n");
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/video", addr)
    }

    fn engine(base: &str) -> TikTokApiEngine {
        TikTokApiEngine::new(Logger::memory_only())
            .with_client(reqwest::Client::builder().no_proxy().build().unwrap())
            .with_media_base(base)
    }

    fn recording_emitter() -> (ProgressEmitter, Arc<Mutex<Vec<EngineEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (ProgressEmitter::new(move |ev| sink.lock().unwrap().push(ev)), events)
    }

    fn progress_of(events: &[EngineEvent]) -> Vec<f32> {
        events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Progress(p) => Some(p.percent),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn streams_to_sanitized_file_with_progress() {
        let body = vec![7u8; 3 * CHUNK_SIZE + 100];
        let base = serve_once("200 OK", body.clone(), true).await;
        let dir = tempfile::tempdir().unwrap();
        let (emitter, events) = recording_emitter();

        let request = DownloadRequest::new(
            "https://www.tiktok.com/@user/video/42",
            dir.path(),
            ENGINE_NAME,
        );
        let outcome = engine(&base).download(&request, emitter).await;
        assert_eq!(outcome, DownloadOutcome::success("Download completed successfully"));

        let written = std::fs::read(dir.path().join("TikTok_Video_42.mp4")).unwrap();
        assert_eq!(written.len(), body.len());

        let events = events.lock().unwrap();
        let progress = progress_of(&events);
        assert!(progress.len() >= 4);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*progress.last().unwrap(), 100.0);
        assert!(matches!(
            events.last().unwrap(),
            EngineEvent::Status(s) if s.text == "Download completed successfully!"
        ));
    }

    #[tokio::test]
    async fn unknown_length_reports_no_progress() {
        let base = serve_once("200 OK", vec![1u8; 5000], false).await;
        let dir = tempfile::tempdir().unwrap();
        let (emitter, events) = recording_emitter();

        let request = DownloadRequest::new("https://vm.tiktok.com/ABC123/", dir.path(), ENGINE_NAME);
        let outcome = engine(&base).download(&request, emitter).await;

        assert!(outcome.is_success());
        assert!(progress_of(&events.lock().unwrap()).is_empty());
        assert_eq!(
            std::fs::metadata(dir.path().join("TikTok_Video_ABC123.mp4")).unwrap().len(),
            5000
        );
    }

    #[tokio::test]
    async fn http_error_is_a_failed_outcome() {
        let base = serve_once("404 Not Found", Vec::new(), true).await;
        let dir = tempfile::tempdir().unwrap();
        let (emitter, events) = recording_emitter();

        let request = DownloadRequest::new("https://www.tiktok.com/@user/video/7", dir.path(), ENGINE_NAME);
        let outcome = engine(&base).download(&request, emitter).await;

        assert!(!outcome.is_success());
        assert!(outcome.message().starts_with("Download failed"));
        // failure text is also the final status
        assert!(matches!(
            events.lock().unwrap().last().unwrap(),
            EngineEvent::Status(s) if s.text == outcome.message()
        ));
    }

    #[tokio::test]
    async fn missing_identifier_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let request = DownloadRequest::new("https://m.tiktok.com/v/abc.html", dir.path(), ENGINE_NAME);

        let outcome = engine("http://127.0.0.1:9/video")
            .download(&request, ProgressEmitter::silent())
            .await;
        assert_eq!(outcome, DownloadOutcome::failure("Could not extract video ID from URL"));
    }

    #[tokio::test]
    async fn validate_url_reports_identifier() {
        let engine = TikTokApiEngine::new(Logger::memory_only());

        let ok = engine.validate_url("https://www.tiktok.com/@a/video/99").await;
        assert!(ok.valid);
        assert_eq!(ok.message, "TikTok video detected (ID: 99)");

        let bad = engine.validate_url("https://www.tiktok.com/foryou").await;
        assert_eq!(bad, UrlCheck::invalid("Invalid TikTok URL format"));
    }

    #[test]
    fn placeholder_record_has_single_best_url() {
        let engine = TikTokApiEngine::new(Logger::memory_only());
        let record = engine.lookup_record("123");

        assert_eq!(record.info.title, "TikTok_Video_123");
        assert_eq!(record.download_urls.len(), 1);
        assert_eq!(
            TikTokApiEngine::select_download_url(&record, Quality::Best),
            Some("https://example.com/video/123.mp4")
        );
        assert!(engine.info().advantages.len() == 4 && !engine.info().recommended);
    }
}
