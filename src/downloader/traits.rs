// Download engine trait definition

use async_trait::async_trait;
use std::sync::Arc;

use super::models::{
    DownloadOutcome, DownloadRequest, EngineDescriptor, EngineEvent, ProgressEvent, StatusEvent,
    UrlCheck,
};

/// Strategy that resolves a source URL to media and performs the transfer.
///
/// `download` completes when the attempt is over; scheduling it off the
/// interactive context is the orchestrator's job. Implementations catch every
/// failure internally and report it as [`DownloadOutcome::Failure`].
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Static descriptor for the info panel
    fn info(&self) -> &EngineDescriptor;

    /// Registry key
    fn name(&self) -> &str {
        &self.info().name
    }

    /// Engine-specific validity check
    async fn validate_url(&self, url: &str) -> UrlCheck;

    /// Fetch the media described by `request`, reporting through `emitter`
    async fn download(&self, request: &DownloadRequest, emitter: ProgressEmitter) -> DownloadOutcome;
}

type EventSink = Arc<dyn Fn(EngineEvent) + Send + Sync>;

/// Observer for progress and status events. Events are handed to the sink in
/// the order they are emitted; a silent emitter drops them.
#[derive(Clone)]
pub struct ProgressEmitter {
    sink: Option<EventSink>,
}

impl ProgressEmitter {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(EngineEvent) + Send + Sync + 'static,
    {
        Self {
            sink: Some(Arc::new(sink)),
        }
    }

    /// Emitter with no observers attached
    pub fn silent() -> Self {
        Self { sink: None }
    }

    pub fn progress(&self, percent: f32) {
        if let Some(sink) = &self.sink {
            sink(EngineEvent::Progress(ProgressEvent::new(percent)));
        }
    }

    pub fn status(&self, text: impl Into<String>) {
        if let Some(sink) = &self.sink {
            sink(EngineEvent::Status(StatusEvent { text: text.into() }));
        }
    }
}

impl std::fmt::Debug for ProgressEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressEmitter")
            .field("attached", &self.sink.is_some())
            .finish()
    }
}
