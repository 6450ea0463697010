//! Scan media libraries through a process-wide filesystem metadata cache.
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

mod app_config;
mod trc;

use media_scan::fs::local::LocalFs;
use media_scan::fs::meta_cache::{CacheOptions, MetaCache};
use media_scan::scan::{ScanOptions, Scanner};

use crate::app_config::Config;
use crate::trc::Trc;

#[derive(Parser)]
#[command(version, about = "Media-library filesystem scanner.")]
struct Args {
    #[arg(
        short,
        long,
        value_parser,
        help = "Optional path to a media-scan config TOML."
    )]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan library roots and report what was found.
    Scan {
        /// Roots to scan instead of the configured libraries.
        #[arg(value_parser)]
        roots: Vec<PathBuf>,
    },
}

/// Main entry point for the application.
fn main() {
    let args = Args::parse();

    // Load config first; errors use eprintln since tracing isn't
    // initialized yet.
    let config = Config::load_or_default(args.config_path.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        std::process::exit(1);
    });
    if let Err(error_messages) = config.validate() {
        eprintln!("Configuration is invalid.");
        for msg in &error_messages {
            eprintln!(" - {msg}");
        }
        std::process::exit(1);
    }

    Trc::default().init().unwrap_or_else(|e| {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    });

    let Command::Scan { roots } = args.command.unwrap_or(Command::Scan { roots: Vec::new() });
    let roots = if roots.is_empty() {
        config.libraries.clone()
    } else {
        roots
    };
    if roots.is_empty() {
        warn!("No library roots configured and none given; nothing to scan.");
        return;
    }

    let cache = Arc::new(MetaCache::new(
        Arc::new(LocalFs),
        CacheOptions {
            capacity: config.cache.capacity,
        },
    ));
    let summary = Scanner::new(cache).scan(
        &roots,
        ScanOptions {
            workers: config.scan.workers,
        },
    );
    info!(
        directories = summary.directories,
        files = summary.files,
        skipped_roots = summary.skipped_roots,
        "Scan complete."
    );
}
