// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tracing initialisation for applications embedding the client.

use std::fs::OpenOptions;
use std::sync::Mutex;

use feie_core::ClientConfig;
use feie_core::error::{FeieError, Result};
use tracing_subscriber::EnvFilter;

/// File created under `ClientConfig::log_path`.
pub const LOG_FILE_NAME: &str = "feie.log";

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `config.log_level` is the filter.
/// With a `log_path` the output is appended (without ANSI colours) to
/// `<log_path>/feie.log`, creating the directory if needed. Without one it
/// goes to stdout.
///
/// Only one global subscriber can exist per process; a second call returns
/// [`FeieError::Logging`].
pub fn init_tracing(config: &ClientConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| FeieError::Logging(format!("filter '{}': {e}", config.log_level)))?;

    match &config.log_path {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE_NAME))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| FeieError::Logging(e.to_string()))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| FeieError::Logging(e.to_string()))?;
        }
    }

    tracing::info!(level = %config.log_level, "feie logging initialised");
    Ok(())
}
