//! Thumbgate - on-demand thumbnail server for signed resize URLs.
//!
//! A request such as `/4238_bpM4oOcw_150x200_s.jpg?ed0eee0cfa25309e40cc0d71`
//! names the source image, the bounding box and a signature. The server
//! verifies the signature, writes the thumbnail into the thumbnail root and
//! redirects back to the same URL, which is then served as a static file.
//!
//! # Usage
//!
//! ```bash
//! # Run the server
//! thumbgate serve --bind 0.0.0.0:8080
//!
//! # Mint a signed URL
//! thumbgate sign 4238 bpM4oOcw 150x200
//!
//! # Check a URL offline
//! thumbgate verify '/4238_bpM4oOcw_150x200_s.jpg?ed0eee0cfa25309e40cc0d71'
//!
//! # View configuration
//! thumbgate config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;
mod server;

/// Thumbgate - on-demand thumbnail server for signed resize URLs.
#[derive(Parser, Debug)]
#[command(name = "thumbgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "THUMBGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve thumbnails over HTTP
    Serve(cli::serve::ServeArgs),

    /// Print a signed thumbnail URL
    Sign(cli::sign::SignArgs),

    /// Decode and verify a thumbnail URL without generating it
    Verify(cli::verify::VerifyArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match &cli.config {
        Some(path) => thumbgate_core::Config::load_from(path)?,
        None => match thumbgate_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `thumbgate config path`."
                );
                thumbgate_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Thumbgate v{}", thumbgate_core::VERSION);

    let config_path = cli
        .config
        .unwrap_or_else(thumbgate_core::Config::default_path);

    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Sign(args) => cli::sign::execute(args, &config),
        Commands::Verify(args) => cli::verify::execute(args, config),
        Commands::Config(args) => cli::config::execute(args, &config, &config_path),
    }
}
