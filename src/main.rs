//! iBag daemon entry point

use ibag_io::app::BagApp;
use ibag_io::config::AppConfig;
use ibag_io::error::Result;
use std::env;
use std::sync::atomic::Ordering;

/// Parse a config path from the command line.
///
/// Supports:
/// - `ibag-io <path>` (positional)
/// - `ibag-io --config <path>` (flag-based)
/// - `ibag-io -c <path>` (short flag)
///
/// Returns `None` when no path was given; the shipped defaults apply.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn main() -> Result<()> {
    let config = match parse_config_path() {
        Some(path) => {
            let config = AppConfig::from_file(&path)?;
            println!("Using config: {}", path);
            config
        }
        None => AppConfig::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.clone()),
    )
    .init();

    log::info!("iBag v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut app = BagApp::new(&config)?;

    let shutdown = app.shutdown_flag();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        shutdown.store(true, Ordering::Relaxed);
    })
    .map_err(|e| ibag_io::Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    app.run()
}
