// Orchestrator: one download attempt at a time, run off the interactive context
//
// The worker never touches `ControlState`. Everything it produces travels over a
// single channel and is applied by whoever owns the orchestrator, in the order it
// was sent.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::backends::EngineRegistry;
use super::errors::DownloadError;
use super::models::{DownloadOutcome, DownloadRequest, EngineEvent};
use super::traits::{DownloadEngine, ProgressEmitter};
use super::validator::UrlValidator;
use crate::logger::Logger;

pub const IDLE_LABEL: &str = "Download Content";
pub const BUSY_LABEL: &str = "Downloading...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Idle,
    Validating,
    Resolving,
    Transferring,
    Completed,
    Failed,
}

/// Everything the interactive surface renders
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub phase: DownloadPhase,
    pub download_enabled: bool,
    pub button_label: String,
    /// Percent, 0..=100
    pub progress: f32,
    pub status: String,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            phase: DownloadPhase::Idle,
            download_enabled: true,
            button_label: IDLE_LABEL.to_string(),
            progress: 0.0,
            status: "Ready".to_string(),
        }
    }
}

/// Produced on the worker, consumed on the interactive context
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    Engine(EngineEvent),
    Finished(DownloadOutcome),
}

pub struct DownloadOrchestrator {
    registry: EngineRegistry,
    validator: UrlValidator,
    logger: Logger,
    state: ControlState,
    tx: UnboundedSender<WorkerMessage>,
    rx: UnboundedReceiver<WorkerMessage>,
}

impl DownloadOrchestrator {
    pub fn new(registry: EngineRegistry, logger: Logger) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            registry,
            validator: UrlValidator::new(),
            logger,
            state: ControlState::default(),
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn is_busy(&self) -> bool {
        !self.state.download_enabled
    }

    /// Run the entry guard and, if it passes, spawn the worker.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, request: DownloadRequest) -> Result<(), DownloadError> {
        if self.is_busy() {
            self.logger.warning("Download request ignored: a download is already in progress");
            return Err(DownloadError::Busy);
        }

        // Validating covers the guard below; a rejected start restores the previous phase
        let previous = self.state.phase;
        self.state.phase = DownloadPhase::Validating;

        match self.prepare(&request) {
            Ok(engine) => {
                self.logger.info(format!("Starting download with {} engine", request.engine));
                self.logger.info(format!("URL: {}", request.url));
                self.logger.info(format!("Quality: {}", request.quality));
                self.logger.info(format!("Output: {}", request.output_dir.display()));

                self.state.download_enabled = false;
                self.state.button_label = BUSY_LABEL.to_string();
                self.state.progress = 0.0;
                self.spawn_worker(engine, request);
                Ok(())
            }
            Err(e) => {
                self.state.phase = previous;
                self.logger.error(e.user_message());
                Err(e)
            }
        }
    }

    fn prepare(&self, request: &DownloadRequest) -> Result<Arc<dyn DownloadEngine>, DownloadError> {
        if request.url.trim().is_empty() {
            return Err(DownloadError::InvalidInput("Please enter a TikTok URL".to_string()));
        }

        let check = self.validator.validate(&request.url);
        if !check.valid {
            return Err(DownloadError::InvalidInput(check.message));
        }

        let engine = self.registry.get(&request.engine)?;
        ensure_output_dir(&request.output_dir)?;
        Ok(engine)
    }

    fn spawn_worker(&self, engine: Arc<dyn DownloadEngine>, request: DownloadRequest) {
        let tx = self.tx.clone();
        let event_tx = self.tx.clone();

        tokio::spawn(async move {
            let emitter = ProgressEmitter::new(move |event| {
                let _ = event_tx.send(WorkerMessage::Engine(event));
            });

            // A panicking engine surfaces as a JoinError instead of killing the session
            let attempt = tokio::spawn(async move { engine.download(&request, emitter).await });
            let outcome = match attempt.await {
                Ok(outcome) => outcome,
                Err(e) => DownloadOutcome::failure(format!("Download failed: {}", e)),
            };

            let _ = tx.send(WorkerMessage::Finished(outcome));
        });
    }

    /// Apply every message that has already arrived. Returns the terminal
    /// outcome if it was among them.
    pub fn pump(&mut self) -> Option<DownloadOutcome> {
        let mut finished = None;
        while let Ok(message) = self.rx.try_recv() {
            if let Some(outcome) = self.apply(message) {
                finished = Some(outcome);
            }
        }
        finished
    }

    /// Apply messages as they arrive until the attempt ends. `observer` sees
    /// the state after each message.
    pub async fn wait_for_completion<F>(&mut self, mut observer: F) -> DownloadOutcome
    where
        F: FnMut(&ControlState, &WorkerMessage),
    {
        loop {
            // The orchestrator holds a sender, so the channel never closes here
            let Some(message) = self.rx.recv().await else {
                return DownloadOutcome::failure("Download failed: worker channel closed");
            };

            let finished = self.apply(message.clone());
            observer(&self.state, &message);
            if let Some(outcome) = finished {
                return outcome;
            }
        }
    }

    fn apply(&mut self, message: WorkerMessage) -> Option<DownloadOutcome> {
        match message {
            WorkerMessage::Engine(EngineEvent::Status(status)) => {
                if self.state.phase == DownloadPhase::Validating {
                    self.state.phase = DownloadPhase::Resolving;
                }
                self.state.status = status.text;
                None
            }
            WorkerMessage::Engine(EngineEvent::Progress(progress)) => {
                if matches!(self.state.phase, DownloadPhase::Validating | DownloadPhase::Resolving) {
                    self.state.phase = DownloadPhase::Transferring;
                }
                self.state.progress = progress.percent;
                None
            }
            WorkerMessage::Finished(outcome) => {
                self.complete(&outcome);
                Some(outcome)
            }
        }
    }

    fn complete(&mut self, outcome: &DownloadOutcome) {
        self.state.download_enabled = true;
        self.state.button_label = IDLE_LABEL.to_string();

        match outcome {
            DownloadOutcome::Success { .. } => {
                self.state.phase = DownloadPhase::Completed;
                self.state.progress = 100.0;
                self.state.status = "Download completed!".to_string();
                self.logger.info("Download completed successfully");
            }
            DownloadOutcome::Failure { message } => {
                self.state.phase = DownloadPhase::Failed;
                self.state.progress = 0.0;
                self.state.status = "Download failed".to_string();
                // Engine messages usually carry the prefix already
                if message.starts_with("Download failed") {
                    self.logger.error(message.clone());
                } else {
                    self.logger.error(format!("Download failed: {}", message));
                }
            }
        }
    }
}

/// Create the output directory if missing. The filesystem error is kept verbatim.
pub fn ensure_output_dir(dir: &Path) -> Result<(), DownloadError> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| DownloadError::Configuration(format!("Could not create output directory: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::{EngineDescriptor, ProgressEvent, StatusEvent, UrlCheck};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    const URL: &str = "https://www.tiktok.com/@user/video/1234567890123456789";

    /// Emits a fixed script of events, then returns `outcome`
    struct ScriptedEngine {
        descriptor: EngineDescriptor,
        outcome: DownloadOutcome,
        gate: Option<Arc<Notify>>,
        panics: bool,
    }

    impl ScriptedEngine {
        fn new(name: &str, outcome: DownloadOutcome) -> Self {
            Self {
                descriptor: EngineDescriptor::new(name, "test engine", &[], false),
                outcome,
                gate: None,
                panics: false,
            }
        }
    }

    #[async_trait]
    impl DownloadEngine for ScriptedEngine {
        fn info(&self) -> &EngineDescriptor {
            &self.descriptor
        }

        async fn validate_url(&self, _url: &str) -> UrlCheck {
            UrlCheck::valid("ok")
        }

        async fn download(&self, _request: &DownloadRequest, emitter: ProgressEmitter) -> DownloadOutcome {
            emitter.status("Extracting video information...");
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.panics {
                panic!("engine exploded");
            }
            emitter.progress(40.0);
            emitter.status("Downloading... 40.0%");
            emitter.progress(90.0);
            self.outcome.clone()
        }
    }

    fn orchestrator(engine: ScriptedEngine) -> (DownloadOrchestrator, Logger) {
        let logger = Logger::memory_only();
        let mut registry = EngineRegistry::new();
        registry.register(Arc::new(engine));
        (DownloadOrchestrator::new(registry, logger.clone()), logger)
    }

    #[tokio::test]
    async fn success_ends_at_exactly_100() {
        let (mut orch, _) = orchestrator(ScriptedEngine::new("mock", DownloadOutcome::success("X")));
        let dir = tempfile::tempdir().unwrap();

        orch.start(DownloadRequest::new(URL, dir.path(), "mock")).unwrap();
        assert!(orch.is_busy());
        assert_eq!(orch.state().button_label, BUSY_LABEL);
        assert_eq!(orch.state().phase, DownloadPhase::Validating);

        let mut phases = Vec::new();
        let outcome = orch.wait_for_completion(|state, _| phases.push(state.phase)).await;

        assert_eq!(outcome, DownloadOutcome::success("X"));
        assert_eq!(orch.state().progress, 100.0);
        assert_eq!(orch.state().status, "Download completed!");
        assert!(orch.state().download_enabled);
        assert_eq!(orch.state().button_label, IDLE_LABEL);
        assert_eq!(
            phases,
            vec![
                DownloadPhase::Resolving,
                DownloadPhase::Transferring,
                DownloadPhase::Transferring,
                DownloadPhase::Transferring,
                DownloadPhase::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn failure_resets_progress() {
        let (mut orch, logger) = orchestrator(ScriptedEngine::new("mock", DownloadOutcome::failure("X")));
        let dir = tempfile::tempdir().unwrap();

        orch.start(DownloadRequest::new(URL, dir.path(), "mock")).unwrap();
        let outcome = orch.wait_for_completion(|_, _| {}).await;

        assert_eq!(outcome.message(), "X");
        assert_eq!(orch.state().progress, 0.0);
        assert_eq!(orch.state().status, "Download failed");
        assert_eq!(orch.state().phase, DownloadPhase::Failed);
        assert!(orch.state().download_enabled);

        let last = logger.recent(1).pop().unwrap();
        assert_eq!(last.level, crate::logger::LogLevel::Error);
        assert_eq!(last.message, "Download failed: X");
    }

    #[tokio::test]
    async fn prefixed_failure_is_logged_once() {
        let (mut orch, logger) = orchestrator(ScriptedEngine::new(
            "mock",
            DownloadOutcome::failure("Download failed: connection reset"),
        ));
        let dir = tempfile::tempdir().unwrap();

        orch.start(DownloadRequest::new(URL, dir.path(), "mock")).unwrap();
        orch.wait_for_completion(|_, _| {}).await;

        let errors: Vec<String> = logger
            .recent(usize::MAX)
            .into_iter()
            .filter(|e| e.level == crate::logger::LogLevel::Error)
            .map(|e| e.message)
            .collect();
        assert_eq!(errors, vec!["Download failed: connection reset".to_string()]);
    }

    #[tokio::test]
    async fn rejected_start_keeps_previous_phase() {
        let (mut orch, _) = orchestrator(ScriptedEngine::new("mock", DownloadOutcome::success("X")));
        let dir = tempfile::tempdir().unwrap();

        orch.start(DownloadRequest::new(URL, dir.path(), "mock")).unwrap();
        orch.wait_for_completion(|_, _| {}).await;
        assert_eq!(orch.state().phase, DownloadPhase::Completed);

        let err = orch
            .start(DownloadRequest::new("https://example.com/x", dir.path(), "mock"))
            .unwrap_err();
        assert!(matches!(err, DownloadError::InvalidInput(_)));
        assert_eq!(orch.state().phase, DownloadPhase::Completed);
        assert!(orch.state().download_enabled);
    }

    #[tokio::test]
    async fn pump_drains_a_finished_attempt() {
        let (mut orch, _) = orchestrator(ScriptedEngine::new("mock", DownloadOutcome::success("X")));
        let dir = tempfile::tempdir().unwrap();
        orch.start(DownloadRequest::new(URL, dir.path(), "mock")).unwrap();

        let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                if let Some(outcome) = orch.pump() {
                    break outcome;
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("worker finished");

        assert_eq!(outcome, DownloadOutcome::success("X"));
        let state = orch.state();
        assert_eq!(state.phase, DownloadPhase::Completed);
        assert_eq!(state.progress, 100.0);
        assert_eq!(state.status, "Download completed!");
        assert_eq!(state.button_label, IDLE_LABEL);
        assert!(state.download_enabled);
        assert!(orch.pump().is_none());
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let mut engine = ScriptedEngine::new("mock", DownloadOutcome::success("done"));
        engine.gate = Some(gate.clone());
        let (mut orch, _) = orchestrator(engine);
        let dir = tempfile::tempdir().unwrap();

        orch.start(DownloadRequest::new(URL, dir.path(), "mock")).unwrap();

        // Any URL, any engine name: the control is disabled
        for (url, engine) in [(URL, "mock"), ("https://vm.tiktok.com/ABC/", "other"), ("", "mock")] {
            let err = orch.start(DownloadRequest::new(url, dir.path(), engine)).unwrap_err();
            assert!(matches!(err, DownloadError::Busy));
        }

        gate.notify_one();
        let outcome = orch.wait_for_completion(|_, _| {}).await;
        assert!(outcome.is_success());

        // Re-enabled afterwards
        orch.start(DownloadRequest::new(URL, dir.path(), "mock")).unwrap();
        gate.notify_one();
        assert!(orch.wait_for_completion(|_, _| {}).await.is_success());
    }

    #[tokio::test]
    async fn guard_rejects_before_any_engine_call() {
        let (mut orch, _) = orchestrator(ScriptedEngine::new("mock", DownloadOutcome::success("X")));
        let dir = tempfile::tempdir().unwrap();

        let err = orch.start(DownloadRequest::new("   ", dir.path(), "mock")).unwrap_err();
        assert_eq!(err.user_message(), "Please enter a TikTok URL");

        let err = orch
            .start(DownloadRequest::new("https://youtube.com/watch?v=1", dir.path(), "mock"))
            .unwrap_err();
        assert_eq!(err.user_message(), "URL is not from TikTok");

        let err = orch.start(DownloadRequest::new(URL, dir.path(), "nope")).unwrap_err();
        assert!(matches!(err, DownloadError::UnknownEngine(_)));

        assert_eq!(orch.state(), &ControlState::default());
        assert!(orch.pump().is_none());
    }

    #[tokio::test]
    async fn output_directory_is_created() {
        let (mut orch, _) = orchestrator(ScriptedEngine::new("mock", DownloadOutcome::success("X")));
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        orch.start(DownloadRequest::new(URL, &nested, "mock")).unwrap();
        assert!(nested.is_dir());
        orch.wait_for_completion(|_, _| {}).await;
    }

    #[tokio::test]
    async fn uncreatable_output_directory_aborts() {
        let (mut orch, _) = orchestrator(ScriptedEngine::new("mock", DownloadOutcome::success("X")));
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        let err = orch
            .start(DownloadRequest::new(URL, file.join("sub"), "mock"))
            .unwrap_err();
        assert!(matches!(err, DownloadError::Configuration(_)));
        assert!(err.user_message().starts_with("Could not create output directory: "));
        assert_eq!(orch.state().phase, DownloadPhase::Idle);
        assert!(orch.state().download_enabled);
    }

    #[tokio::test]
    async fn panicking_engine_becomes_failure() {
        let mut engine = ScriptedEngine::new("mock", DownloadOutcome::success("X"));
        engine.panics = true;
        let (mut orch, _) = orchestrator(engine);
        let dir = tempfile::tempdir().unwrap();

        orch.start(DownloadRequest::new(URL, dir.path(), "mock")).unwrap();
        let outcome = orch.wait_for_completion(|_, _| {}).await;

        assert!(!outcome.is_success());
        assert!(outcome.message().starts_with("Download failed"));
        assert_eq!(orch.state().progress, 0.0);
        assert!(orch.state().download_enabled);
    }

    #[tokio::test]
    async fn pump_delivers_in_production_order() {
        let (mut orch, _) = orchestrator(ScriptedEngine::new("mock", DownloadOutcome::success("X")));
        let dir = tempfile::tempdir().unwrap();
        orch.start(DownloadRequest::new(URL, dir.path(), "mock")).unwrap();

        let mut seen = Vec::new();
        orch.wait_for_completion(|_, message| seen.push(message.clone())).await;

        let expected = vec![
            WorkerMessage::Engine(EngineEvent::Status(StatusEvent {
                text: "Extracting video information...".to_string(),
            })),
            WorkerMessage::Engine(EngineEvent::Progress(ProgressEvent::new(40.0))),
            WorkerMessage::Engine(EngineEvent::Status(StatusEvent {
                text: "Downloading... 40.0%".to_string(),
            })),
            WorkerMessage::Engine(EngineEvent::Progress(ProgressEvent::new(90.0))),
            WorkerMessage::Finished(DownloadOutcome::success("X")),
        ];
        assert_eq!(seen, expected);
        assert!(orch.pump().is_none());
    }
}
