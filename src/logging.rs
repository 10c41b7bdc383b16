//! Log output for the gate controller
//!
//! One `tracing` subscriber per process: a stdout layer and, outside tests,
//! a daily file under the configured log directory. Components log through
//! [`StructuredLogger`], which tags each line with the component, the lane
//! being served and any extra key/value pairs (usually the plate).

use crate::config::LoggingConfig;
use crate::error::{ParkgateError, Result};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Once;
use tracing::{Level, debug, error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Dropping the guard would lose buffered file output
static FILE_WRITER_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static SETUP: Once = Once::new();
static SETUP_FAILURE: OnceCell<String> = OnceCell::new();

/// Install the global subscriber. Later calls return the first outcome.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    SETUP.call_once(|| {
        if let Err(e) = install(config) {
            let _ = SETUP_FAILURE.set(e.to_string());
        }
    });

    match SETUP_FAILURE.get() {
        Some(reason) => Err(ParkgateError::config(reason.clone())),
        None => Ok(()),
    }
}

fn install(config: &LoggingConfig) -> Result<()> {
    let base = parse_log_level(&config.level)?;
    let override_or_base = |value: &Option<String>| {
        value
            .as_deref()
            .and_then(|s| parse_log_level(s).ok())
            .unwrap_or(base)
    };
    let console_level = override_or_base(&config.console_level);
    let file_level = override_or_base(&config.file_level);

    let filter = crate_filter(more_verbose(console_level, file_level));

    if file_logging_disabled() {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer(config.json_format, console_level))
            .init();
        info!("Logging to stdout only at {:?}", console_level);
        return Ok(());
    }

    install_with_file(config, filter, console_level, file_level)
}

fn crate_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("parkgate={},reqwest=warn,hyper=warn", level).into())
}

fn file_logging_disabled() -> bool {
    cfg!(test) || std::env::var_os("PARKGATE_DISABLE_FILE_LOG").is_some()
}

fn console_layer<S>(json: bool, level: Level) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + 'static,
{
    let layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);
    if json {
        layer
            .json()
            .with_filter(LevelFilter::from_level(level))
            .boxed()
    } else {
        layer.with_filter(LevelFilter::from_level(level)).boxed()
    }
}

/// Directory for the rolling files: `logging.file` may name a file or a dir
fn log_dir(file: &str) -> &Path {
    let path = Path::new(file);
    match path.extension() {
        Some(_) => path.parent().unwrap_or(path),
        None => path,
    }
}

fn install_with_file(
    config: &LoggingConfig,
    filter: EnvFilter,
    console_level: Level,
    file_level: Level,
) -> Result<()> {
    let appender = rolling::Builder::new()
        .rotation(rolling::Rotation::DAILY)
        .filename_prefix("parkgate")
        .filename_suffix("log")
        .max_log_files(config.backup_count.max(1) as usize)
        .build(log_dir(&config.file))
        .map_err(|e| ParkgateError::io(format!("Cannot open log directory: {}", e)))?;

    let (writer, guard) = non_blocking(appender);
    let _ = FILE_WRITER_GUARD.set(guard);

    let file_layer = {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false);
        if config.json_format {
            layer
                .json()
                .with_filter(LevelFilter::from_level(file_level))
                .boxed()
        } else {
            layer
                .with_filter(LevelFilter::from_level(file_level))
                .boxed()
        }
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if config.console_output {
        registry
            .with(console_layer(config.json_format, console_level))
            .init();
    } else {
        registry.init();
    }

    info!(
        "Logging to {} at {:?} (stdout {:?})",
        config.file, file_level, console_level
    );
    Ok(())
}

/// Accepts the usual level names in any case; `warning` means `warn`
fn parse_log_level(name: &str) -> Result<Level> {
    match name.to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ParkgateError::config(format!("Unknown log level '{}'", name))),
    }
}

/// The chattier of two levels; the global filter must let both through
fn more_verbose(a: Level, b: Level) -> Level {
    // tracing orders levels by verbosity, TRACE being the greatest
    if a >= b { a } else { b }
}

/// Tags carried by a [`StructuredLogger`]
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Module doing the logging ("dispatcher", "gate", "link", ...)
    pub component: String,
    /// "entry" or "exit" while an event is in flight
    pub lane: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl LogContext {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            lane: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_lane(mut self, lane: &str) -> Self {
        self.lane = Some(lane.to_string());
        self
    }

    pub fn with_field(mut self, key: &str, value: String) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

/// Component logger; every event carries a `tags` field built from its
/// [`LogContext`]
#[derive(Clone)]
pub struct StructuredLogger {
    context: LogContext,
}

impl StructuredLogger {
    pub fn new(context: LogContext) -> Self {
        Self { context }
    }

    pub fn info(&self, message: &str) {
        let tags = self.tags();
        info!(%tags, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        let tags = self.tags();
        warn!(%tags, "{}", message);
    }

    pub fn error(&self, message: &str) {
        let tags = self.tags();
        error!(%tags, "{}", message);
    }

    pub fn debug(&self, message: &str) {
        let tags = self.tags();
        debug!(%tags, "{}", message);
    }

    pub fn trace(&self, message: &str) {
        let tags = self.tags();
        trace!(%tags, "{}", message);
    }

    fn tags(&self) -> String {
        let lane = self.context.lane.iter().map(|l| format!("lane={}", l));
        let extra = self
            .context
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v));
        std::iter::once(format!("component={}", self.context.component))
            .chain(lane)
            .chain(extra)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Logger tagged with just a component name
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger::new(LogContext::new(component))
}

/// Logger for an explicit context
pub fn get_logger_with_context(context: LogContext) -> StructuredLogger {
    StructuredLogger::new(context)
}
