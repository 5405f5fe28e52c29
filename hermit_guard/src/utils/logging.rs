//! # Logging Initialization
//!
//! Centralized setup for the `tracing` ecosystem. Call
//! `init_logging(log_level, log_to_file)` once at startup; a `std::sync::Once`
//! guard makes repeat calls harmless.
//!
//! Verbosity follows `RUST_LOG` when set, otherwise defaults to the given
//! level for most crates and `debug` for `hermit_guard` itself. With
//! `log_to_file = true`, output goes to a daily rolling file in the
//! user-specific cache directory (via the `directories` crate) with ANSI
//! colors disabled; if that directory cannot be created or written, or with
//! `log_to_file = false`, output goes to stderr with colors enabled.

use anyhow::Result;
use directories::ProjectDirs;
use std::{io::stderr, path::Path, sync::Once};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

/// Initialize verbose logging for tests.
///
/// This configures a `trace`-level subscriber that logs to stderr.
pub fn init_test_logging() {
    init_logging("trace", false).expect("Failed to initialize test logging");
}

/// Initializes the logging system.
///
/// # Errors
///
/// Returns an error if the subscriber cannot be installed.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<()> {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},hermit_guard=debug")));

        if log_to_file && let Some(proj_dirs) = ProjectDirs::from("com", "HermitGuard", "hermit_guard")
        {
            let log_dir = proj_dirs.cache_dir();

            // tracing-appender 0.2.4+ panics on permission errors, so probe
            // writability first and catch the remaining failure modes.
            let file_appender_result = if can_write_to(log_dir) {
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    tracing_appender::rolling::daily(log_dir, "hermit_guard.log")
                }))
            } else {
                Err(Box::new("Cannot write to log directory") as Box<dyn std::any::Any + Send>)
            };

            if let Ok(file_appender) = file_appender_result {
                let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(non_blocking).with_ansi(false))
                    .init();
                // The guard is intentionally leaked so logs flush on exit.
                Box::leak(Box::new(_guard));
                return;
            }
        }

        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer().with_writer(stderr).with_ansi(true))
            .init();
    });

    Ok(())
}

/// Test if we can write to the given directory.
///
/// Creates the directory if needed, then attempts to create and remove a
/// probe file.
fn can_write_to(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }

    let probe = dir.join(".hermit_log_test");
    match std::fs::write(&probe, "test") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
