use anyhow::{Result, anyhow};
use clap::Parser;
use hermit_guard::config::GuardConfig;
use hermit_guard::size::TestSize;
use std::path::PathBuf;
use tracing::{error, info};

/// Hermit Guard Configuration Validator
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Validates hermit.toml enforcement configuration files: mode strings, \
                  time-limit ordering, and filesystem allow-list rules."
)]
struct Cli {
    /// Paths to configuration files to validate, or blank for './hermit.toml'.
    #[arg(default_value = "hermit.toml")]
    config_files: Vec<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    hermit_guard::utils::logging::init_logging(log_level, false)?;

    if validate_all(&cli.config_files) {
        info!("All configurations are valid.");
        Ok(())
    } else {
        Err(anyhow!(
            "Some configurations are invalid. Please check the error messages above."
        ))
    }
}

fn validate_all(files: &[PathBuf]) -> bool {
    let mut all_valid = true;

    for path in files {
        match GuardConfig::load_from_file(path) {
            Ok(config) => {
                let limits = match config.limits() {
                    Ok(limits) => limits,
                    Err(err) => {
                        error!("{}: {}", path.display(), err);
                        all_valid = false;
                        continue;
                    }
                };
                info!(
                    "{} is valid: enforcement={}, distribution={}, small limit {:.1}s",
                    path.display(),
                    config.enforcement_mode,
                    config.distribution_mode,
                    limits.limit_for(TestSize::Small).as_secs_f64()
                );
            }
            Err(err) => {
                error!("{}: {}", path.display(), err);
                all_valid = false;
            }
        }
    }

    all_valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn valid_config_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "hermit.toml", "enforcement_mode = \"strict\"\n");
        assert!(validate_all(&[path]));
    }

    #[test]
    fn invalid_ordering_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "hermit.toml",
            "[time_limits]\nsmall_seconds = 500.0\nmedium_seconds = 1.0\n",
        );
        assert!(!validate_all(&[path]));
    }

    #[test]
    fn missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!validate_all(&[dir.path().join("absent.toml")]));
    }
}
