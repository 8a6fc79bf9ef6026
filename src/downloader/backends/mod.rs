// Download engines and the name -> engine registry

pub mod tiktok_api;
pub mod ytdlp;

pub use tiktok_api::TikTokApiEngine;
pub use ytdlp::YtDlpEngine;

use std::collections::BTreeMap;
use std::sync::Arc;

use super::errors::DownloadError;
use super::models::EngineDescriptor;
use super::traits::DownloadEngine;
use crate::logger::Logger;

pub const DEFAULT_ENGINE: &str = ytdlp::ENGINE_NAME;

/// Names the selection surface offers
pub const ENGINE_NAMES: [&str; 2] = [ytdlp::ENGINE_NAME, tiktok_api::ENGINE_NAME];

pub fn is_known_engine(name: &str) -> bool {
    ENGINE_NAMES.contains(&name)
}

/// Engines keyed by name. Unknown names are a configuration error.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: BTreeMap<String, Arc<dyn DownloadEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two shipped engines
    pub fn with_default_engines(logger: Logger) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(YtDlpEngine::new(logger.clone())));
        registry.register(Arc::new(TikTokApiEngine::new(logger)));
        registry
    }

    pub fn register(&mut self, engine: Arc<dyn DownloadEngine>) {
        self.engines.insert(engine.name().to_string(), engine);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn DownloadEngine>, DownloadError> {
        self.engines
            .get(name)
            .cloned()
            .ok_or_else(|| DownloadError::UnknownEngine(name.to_string()))
    }

    /// Descriptors, recommended engines first
    pub fn descriptors(&self) -> Vec<EngineDescriptor> {
        let mut all: Vec<EngineDescriptor> = self.engines.values().map(|e| e.info().clone()).collect();
        all.sort_by_key(|d| !d.recommended);
        all
    }

    pub fn names(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_two_engines_ship() {
        let registry = EngineRegistry::with_default_engines(Logger::memory_only());
        assert_eq!(registry.names(), vec!["tiktok-api", "yt-dlp"]);

        let descriptors = registry.descriptors();
        assert_eq!(descriptors[0].name, "yt-dlp");
        assert!(descriptors[0].recommended);
        assert_eq!(descriptors[1].name, "tiktok-api");
        assert!(!descriptors[1].recommended);
    }

    #[test]
    fn unknown_engine_is_configuration_error() {
        let registry = EngineRegistry::with_default_engines(Logger::memory_only());
        match registry.get("youtube-dl") {
            Err(DownloadError::UnknownEngine(name)) => assert_eq!(name, "youtube-dl"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unknown engine resolved"),
        }
        assert!(registry.get("yt-dlp").is_ok());
    }

    #[test]
    fn known_names() {
        assert!(is_known_engine("yt-dlp"));
        assert!(is_known_engine("tiktok-api"));
        assert!(!is_known_engine("Yt-Dlp"));
        assert_eq!(DEFAULT_ENGINE, "yt-dlp");
    }
}
