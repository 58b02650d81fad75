//! Logging and tracing setup.
//!
//! Human-readable events go to stderr. When a log location can be resolved,
//! the same events are also written as JSON lines through a non-blocking
//! daily-rolling file appender.
//!
//! Log file resolution, first match wins:
//! 1. `TERMLINT_LOG_PATH` (an explicit file)
//! 2. `TERMLINT_LOG_DIR`
//! 3. `log_dir` from the loaded configuration
//! 4. The platform data directory (`~/.local/share/termlint/logs` on Linux)

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_PATH_ENV: &str = "TERMLINT_LOG_PATH";
const LOG_DIR_ENV: &str = "TERMLINT_LOG_DIR";
const LOG_FILE_PREFIX: &str = "termlint.log";

/// Where file logs go, if anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Exact log file; no rotation.
    pub log_file: Option<PathBuf>,
    /// Directory for daily-rolled log files.
    pub log_dir: Option<PathBuf>,
}

impl ObservabilityConfig {
    /// Resolve log locations from the environment, then `config_log_dir`,
    /// then the platform default.
    pub fn from_env_with_overrides(config_log_dir: Option<PathBuf>) -> Self {
        Self::resolve(
            std::env::var_os(LOG_PATH_ENV).map(PathBuf::from),
            std::env::var_os(LOG_DIR_ENV).map(PathBuf::from),
            config_log_dir,
            termlint_core::config::user_data_local_dir()
                .map(|dir| dir.join("logs").into_std_path_buf()),
        )
    }

    fn resolve(
        env_path: Option<PathBuf>,
        env_dir: Option<PathBuf>,
        config_dir: Option<PathBuf>,
        default_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(path) = env_path.filter(|p| !p.as_os_str().is_empty()) {
            return Self {
                log_file: Some(path),
                log_dir: None,
            };
        }
        Self {
            log_file: None,
            log_dir: env_dir
                .filter(|p| !p.as_os_str().is_empty())
                .or(config_dir)
                .or(default_dir),
        }
    }
}

/// Level directive implied by the CLI flags and the configured level.
fn level_directive(quiet: bool, verbose: u8, config_level: &str) -> &str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => config_level,
        1 => "debug",
        _ => "trace",
    }
}

/// Build the event filter. `RUST_LOG` wins when set.
pub fn env_filter(quiet: bool, verbose: u8, config_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(quiet, verbose, config_level)))
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes buffered file logs.
pub fn init_observability(
    config: &ObservabilityConfig,
    filter: EnvFilter,
) -> anyhow::Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let (file_layer, guard) = match file_appender(config) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(guard)
}

/// Open the file appender; logging to files is best effort.
fn file_appender(config: &ObservabilityConfig) -> Option<tracing_appender::rolling::RollingFileAppender> {
    if let Some(ref path) = config.log_file {
        let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let name = path.file_name()?;
        std::fs::create_dir_all(dir).ok()?;
        return Some(tracing_appender::rolling::never(dir, name));
    }
    let dir = config.log_dir.as_ref()?;
    std::fs::create_dir_all(dir).ok()?;
    Some(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))
}
