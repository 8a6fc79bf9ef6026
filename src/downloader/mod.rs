// Downloader module: engine abstraction, engines and the orchestrator

pub mod backends;
pub mod diagnostics;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod tools;
pub mod traits;
pub mod utils;
pub mod validator;

pub use backends::{EngineRegistry, TikTokApiEngine, YtDlpEngine};
pub use errors::DownloadError;
pub use models::{DownloadOutcome, DownloadRequest, EngineDescriptor, EngineEvent, Quality, UrlCheck};
pub use orchestrator::{ControlState, DownloadOrchestrator, DownloadPhase, WorkerMessage};
pub use traits::{DownloadEngine, ProgressEmitter};
pub use validator::UrlValidator;
