//! Tracing setup for Streamgate
//!
//! The console shows Streamgate's own events at the level the operator picked
//! and keeps the HTTP stack quiet. Every event of the run, including per-chunk
//! debug output from the sequencer, goes to a trace file that is replaced on
//! each start.

use std::fs::{File, create_dir_all};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LoggingConfig;

/// Name of the per-run log file inside the logs directory.
pub const LOG_FILE_NAME: &str = "streamgate-last-run.log";

/// Target prefix shared by every crate in the workspace.
const WORKSPACE_TARGET: &str = "streamgate";

/// Failures while installing the subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("cannot prepare log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("tracing subscriber already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Installs console and file logging for the process.
///
/// `RUST_LOG` replaces the console filter when set. Returns the path of the
/// trace file.
///
/// # Errors
///
/// - `TracingError::LogFile` - The logs directory or file cannot be created
/// - `TracingError::AlreadyInitialized` - A global subscriber is already set
pub fn init_tracing(
    console_level: Level,
    logging: &LoggingConfig,
) -> Result<PathBuf, TracingError> {
    let (log_file_path, log_file) = open_log_file(&logging.logs_dir)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_directives(console_level)));

    let console_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new("trace"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        console = %console_level,
        trace_file = %log_file_path.display(),
        "Logging started"
    );

    Ok(log_file_path)
}

/// Console filter directives for `level`.
///
/// Third-party crates never log above `warn` unless `trace` is requested.
pub fn console_directives(level: Level) -> String {
    let third_party = if level == Level::TRACE {
        Level::TRACE
    } else {
        level.min(Level::WARN)
    };
    format!(
        "{},{WORKSPACE_TARGET}={}",
        third_party.as_str().to_ascii_lowercase(),
        level.as_str().to_ascii_lowercase()
    )
}

fn open_log_file(logs_dir: &Path) -> Result<(PathBuf, File), TracingError> {
    let path = logs_dir.join(LOG_FILE_NAME);
    let wrap = |source| TracingError::LogFile {
        path: path.clone(),
        source,
    };

    create_dir_all(logs_dir).map_err(wrap)?;
    let file = File::create(&path).map_err(wrap)?;
    Ok((path, file))
}

/// Console verbosity selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Failures only
    Error,
    /// Failures and rate-limit pauses
    Warn,
    /// Server lifecycle and one line per stream
    Info,
    /// Chunk completion and cache activity
    Debug,
    /// Everything, including the HTTP stack
    Trace,
}

/// ```
/// use streamgate_core::tracing_setup::CliLogLevel;
///
/// assert_eq!(tracing::Level::from(CliLogLevel::Info), tracing::Level::INFO);
/// ```
impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}
