pub mod cli;
pub mod downloader;
pub mod logger;
pub mod paths;
pub mod settings;

use clap::Parser;

/// Parse the command line, run one command, return the process exit code
pub fn run() -> i32 {
    logger::init_tracing();
    let cli = cli::Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return 1;
        }
    };

    runtime.block_on(cli::execute(cli))
}
