//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Turn the host's logging settings (`LogConfig`) into one file logger.
//! - Give property groups a sink for their `event=... module=property` lines.
//!
//! # Invariants
//! - At most one logger per process; a repeated `init_logging` with the same
//!   config is a no-op and a different config is rejected.
//! - Records are written straight to the file, so a reader sees them as soon
//!   as the logging call returns.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{info, LevelFilter};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "emit";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 5;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    config: LogConfig,
    _handle: LoggerHandle,
}

/// Where and how verbosely the process logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    dir: PathBuf,
    level: LevelFilter,
}

impl LogConfig {
    /// `dir` must be absolute.
    pub fn new(dir: impl Into<PathBuf>, level: LevelFilter) -> Result<Self, String> {
        let dir = dir.into();
        if !dir.is_absolute() {
            return Err(format!(
                "log directory must be absolute, got `{}`",
                dir.display()
            ));
        }
        Ok(Self { dir, level })
    }

    /// Builds a config from the CLI's `LOG_DIR [LEVEL]` arguments.
    ///
    /// A missing level falls back to [`default_log_level`].
    pub fn from_args(dir: &str, level: Option<&str>) -> Result<Self, String> {
        let level = match level {
            Some(raw) => raw
                .trim()
                .parse::<LevelFilter>()
                .map_err(|_| format!("unsupported log level `{raw}`"))?,
            None => default_log_level(),
        };
        Self::new(Path::new(dir.trim()), level)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

/// Starts the file logger described by `config`.
///
/// # Errors
/// - The directory cannot be created or the backend fails to start.
/// - Logging already runs with a different config.
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let active = ACTIVE.get_or_try_init(|| start_logger(config.clone()))?;
    if active.config != *config {
        return Err(format!(
            "logging already runs at {} in `{}`; refusing to switch to {} in `{}`",
            active.config.level,
            active.config.dir.display(),
            config.level,
            config.dir.display()
        ));
    }
    Ok(())
}

/// The config logging was started with, if any.
pub fn logging_status() -> Option<LogConfig> {
    ACTIVE.get().map(|active| active.config.clone())
}

/// `Debug` for debug builds, `Info` otherwise.
pub fn default_log_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn start_logger(config: LogConfig) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&config.dir).map_err(|err| {
        format!(
            "failed to create log directory `{}`: {err}",
            config.dir.display()
        )
    })?;

    let spec = LogSpecification::builder().default(config.level).build();
    let handle = Logger::with(spec)
        .log_to_file(
            FileSpec::default()
                .directory(config.dir.as_path())
                .basename(LOG_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_LOG_FILES),
        )
        .write_mode(WriteMode::Direct)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    info!(
        "event=core_init module=logging status=ok version={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        config.level,
        config.dir.display()
    );

    Ok(ActiveLogger {
        config,
        _handle: handle,
    })
}
