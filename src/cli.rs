//! Terminal front-end. This is the interactive context: it owns the
//! orchestrator and renders `ControlState` as worker messages arrive.

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use crate::downloader::backends::{is_known_engine, EngineRegistry, ENGINE_NAMES};
use crate::downloader::models::{DownloadOutcome, DownloadRequest, Quality};
use crate::downloader::orchestrator::DownloadOrchestrator;
use crate::downloader::tools::ToolManager;
use crate::downloader::validator::UrlValidator;
use crate::logger::Logger;
use crate::paths::AppPaths;
use crate::settings::{Settings, SettingsStore};

#[derive(Parser, Debug)]
#[command(name = "hikari", version, about = "Download TikTok videos with a choice of engines")]
pub struct Cli {
    /// Directory holding settings.json, logs/ and Downloads/ (defaults to the executable's directory)
    #[arg(long, env = "HIKARI_HOME", global = true)]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download one video
    Download {
        url: String,

        /// Engine to use (yt-dlp, tiktok-api); remembered for next time
        #[arg(long, short)]
        engine: Option<String>,

        /// Output folder; remembered for next time
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[arg(long, default_value = "best")]
        quality: String,

        /// Print recent log entries afterwards
        #[arg(long)]
        diagnostics: bool,
    },

    /// Check whether a URL looks like a TikTok video
    Validate {
        url: String,

        /// Also ask this engine (yt-dlp contacts the network)
        #[arg(long, short)]
        engine: Option<String>,
    },

    /// Print the video identifier contained in a URL
    Id { url: String },

    /// Describe the available engines
    Engines,

    /// Show or change persisted settings
    Settings {
        #[arg(long, conflicts_with = "reset_output")]
        output: Option<PathBuf>,

        /// Go back to the default Downloads folder
        #[arg(long)]
        reset_output: bool,

        #[arg(long)]
        engine: Option<String>,
    },

    /// Print the tail of the log file
    Logs {
        #[arg(long, short, default_value_t = 20)]
        count: usize,
    },
}

/// Collaborators constructed once per session
struct Session {
    logger: Logger,
    store: SettingsStore,
    settings: Settings,
    registry: EngineRegistry,
    validator: UrlValidator,
}

impl Session {
    fn open(paths: &AppPaths) -> Self {
        let logger = Logger::new(&paths.log_dir());
        let store = SettingsStore::new(paths.settings_file(), paths.default_downloads_dir(), logger.clone());
        let settings = store.load();
        let registry = EngineRegistry::with_default_engines(logger.clone());

        Self {
            logger,
            store,
            settings,
            registry,
            validator: UrlValidator::new(),
        }
    }

    fn set_output_dir(&mut self, dir: PathBuf) {
        self.logger.info(format!("Output folder changed to: {}", dir.display()));
        self.settings.last_output_dir = dir;
        self.persist();
    }

    /// Save settings; a failure is reported and the session goes on
    fn persist(&self) -> bool {
        match self.store.save(&self.settings) {
            Ok(()) => true,
            Err(e) => {
                fail(e.user_message());
                false
            }
        }
    }

    fn set_engine(&mut self, name: &str) -> bool {
        if !is_known_engine(name) {
            fail(format!(
                "Unknown engine '{}'. Available: {}",
                name,
                ENGINE_NAMES.join(", ")
            ));
            return false;
        }
        self.settings.engine = name.to_string();
        true
    }

    fn shutdown(&self) {
        self.persist();
    }
}

fn fail(message: impl AsRef<str>) {
    eprintln!("{} {}", style("✗").red(), message.as_ref());
}

fn ok(message: impl AsRef<str>) {
    println!("{} {}", style("✓").green(), message.as_ref());
}

pub async fn execute(cli: Cli) -> i32 {
    let paths = AppPaths::resolve(cli.home);

    if let Commands::Logs { count } = cli.command {
        return show_log_file(&paths, count);
    }

    let mut session = Session::open(&paths);
    let code = match cli.command {
        Commands::Download {
            url,
            engine,
            output,
            quality,
            diagnostics,
        } => download(&mut session, &url, engine, output, &quality, diagnostics).await,
        Commands::Validate { url, engine } => validate(&session, &url, engine).await,
        Commands::Id { url } => match session.validator.extract_id(&url) {
            Some(id) => {
                println!("{}", id);
                0
            }
            None => {
                fail("No video ID found in URL");
                1
            }
        },
        Commands::Engines => {
            list_engines(&session);
            0
        }
        Commands::Settings {
            output,
            reset_output,
            engine,
        } => update_settings(&mut session, output, reset_output, engine),
        Commands::Logs { .. } => 0,
    };

    session.shutdown();
    code
}

async fn download(
    session: &mut Session,
    url: &str,
    engine: Option<String>,
    output: Option<PathBuf>,
    quality: &str,
    diagnostics: bool,
) -> i32 {
    if let Some(name) = engine.as_deref() {
        if !session.set_engine(name) {
            return 1;
        }
    }
    if let Some(dir) = output {
        session.set_output_dir(dir);
    }
    let quality: Quality = match quality.parse() {
        Ok(q) => q,
        Err(e) => {
            fail(format!("{}", e));
            return 1;
        }
    };

    let url = session.validator.normalize(url.trim());
    let request = DownloadRequest::new(
        url,
        session.settings.last_output_dir.clone(),
        session.settings.engine.clone(),
    )
    .with_quality(quality);

    let mut orchestrator = DownloadOrchestrator::new(session.registry.clone(), session.logger.clone());
    if let Err(e) = orchestrator.start(request) {
        fail(e.user_message());
        return 1;
    }

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos:>3}% {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    bar.set_message(orchestrator.state().button_label.clone());

    let outcome = orchestrator
        .wait_for_completion(|state, _| {
            bar.set_position(state.progress.round() as u64);
            bar.set_message(state.status.clone());
        })
        .await;
    bar.finish_and_clear();

    let code = match &outcome {
        DownloadOutcome::Success { message } => {
            ok(format!("{} ({})", message, session.settings.last_output_dir.display()));
            0
        }
        DownloadOutcome::Failure { message } => {
            fail(message);
            1
        }
    };

    if diagnostics {
        println!("\n{}", style("Recent Logs").bold());
        let recent = session.logger.recent(20);
        if recent.is_empty() {
            println!("No logs available");
        }
        for entry in recent {
            println!("{}", entry.display_line());
        }
    }

    code
}

async fn validate(session: &Session, url: &str, engine: Option<String>) -> i32 {
    let url = session.validator.normalize(url.trim());
    let check = session.validator.validate(&url);

    if check.valid {
        session.logger.info(format!("Valid URL detected: {}", url));
        ok(&check.message);
        if let Some(id) = session.validator.extract_id(&url) {
            println!("  ID: {}", id);
        }
    } else {
        session.logger.warning(format!("Invalid URL: {}", check.message));
        fail(&check.message);
    }

    let mut valid = check.valid;
    if let Some(name) = engine {
        match session.registry.get(&name) {
            Ok(engine) => {
                let engine_check = engine.validate_url(&url).await;
                let line = format!("[{}] {}", name, engine_check.message);
                if engine_check.valid {
                    ok(line);
                } else {
                    fail(line);
                }
                valid &= engine_check.valid;
            }
            Err(e) => {
                fail(e.user_message());
                return 1;
            }
        }
    }

    if valid {
        0
    } else {
        1
    }
}

fn list_engines(session: &Session) {
    let active = &session.settings.engine;
    for descriptor in session.registry.descriptors() {
        let marker = if &descriptor.name == active { "*" } else { " " };
        println!("{} {}", marker, style(&descriptor.name).bold());
        for line in descriptor.summary().lines() {
            println!("    {}", line);
        }

        if descriptor.name == crate::downloader::backends::ytdlp::ENGINE_NAME {
            let tool = ToolManager::new().ytdlp_info();
            match (tool.is_available, tool.version, tool.path) {
                (true, Some(version), Some(path)) => println!("    Tool: {} ({})", version, path),
                _ => println!("    Tool: {}", style("yt-dlp not found").yellow()),
            }
        }
        println!();
    }
}

fn update_settings(
    session: &mut Session,
    output: Option<PathBuf>,
    reset_output: bool,
    engine: Option<String>,
) -> i32 {
    if let Some(dir) = output {
        if let Err(e) = crate::downloader::orchestrator::ensure_output_dir(&dir) {
            fail(e.user_message());
            return 1;
        }
        session.set_output_dir(dir);
    } else if reset_output {
        let default_dir = session.store.default_output_dir().to_path_buf();
        session.logger.info(format!("Output folder reset to default: {}", default_dir.display()));
        session.settings.last_output_dir = default_dir;
        session.persist();
    }

    if let Some(name) = engine.as_deref() {
        if !session.set_engine(name) {
            return 1;
        }
        session.persist();
    }

    println!("Settings file: {}", session.store.path().display());
    println!("  last_output_dir: {}", session.settings.last_output_dir.display());
    println!("  engine:          {}", session.settings.engine);
    println!("  quality:         {}", session.settings.quality);
    0
}

fn show_log_file(paths: &AppPaths, count: usize) -> i32 {
    let path = paths.log_dir().join(crate::logger::LOG_FILE_NAME);
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            let lines: Vec<&str> = text.lines().collect();
            let start = lines.len().saturating_sub(count);
            if lines.is_empty() {
                println!("No logs available");
            }
            for line in &lines[start..] {
                println!("{}", line);
            }
            0
        }
        Err(_) => {
            println!("No logs available");
            0
        }
    }
}
