//! Keymode - modal keystroke dispatch for editor hosts

use anyhow::Result;
use clap::Parser;
use keymode::config;
use std::path::PathBuf;

mod term;

/// Terminal demo for the keymode dispatch engine
#[derive(Parser)]
#[command(name = "keymode")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON file holding the `modes` array (built-in sample when
    /// omitted)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Log to /tmp/keymode.log - tail with: tail -f /tmp/keymode.log
    // Set DEBUG=0-3 to control verbosity (0=off, 1=warn, 2=info, 3=debug)
    let debug_level = std::env::var("DEBUG")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .unwrap_or(0);

    if debug_level > 0 {
        let level = match debug_level {
            1 => tracing::Level::WARN,
            2 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        };

        let file_appender = tracing_appender::rolling::never("/tmp", "keymode.log");
        tracing_subscriber::fmt()
            .with_writer(file_appender)
            .with_max_level(level)
            .with_ansi(false)
            .init();
    }

    let cli = Cli::parse();

    let raw = match cli.config {
        Some(path) => config::load_value(&path)?,
        None => config::sample(),
    };

    term::run(raw)
}
