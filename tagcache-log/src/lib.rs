//! Logging for the tagcache crates.
//!
//! Records go to stderr in one of three formats and are filtered by a
//! global level that is read once from the environment and can be changed
//! at runtime.
//!
//! # Usage
//!
//! ```rust
//! use tagcache_log::{debug, info, warn};
//!
//! debug!("resolving reference key");
//! info!("sweep started with period {:?}", std::time::Duration::from_secs(1));
//! warn!(target: "tagcache::memcached", "index write raced");
//! ```
//!
//! # Environment Variables
//!
//! - `TAGCACHE_DEBUG=1` - force debug records on
//! - `TAGCACHE_LOG_LEVEL=trace|debug|info|warn|error|off`
//! - `TAGCACHE_LOG_FORMAT=pretty|compact|json` (default `json`)
//! - `TAGCACHE_LOG_TIMESTAMPS=1|0`

use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Suppresses every record.
    Off = 5,
}

impl Level {
    /// Upper-case name used in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-field human readable line
    Pretty,
    /// Short single-letter level line
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration, resolved once from the environment.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
    pub timestamps: bool,
    #[cfg(feature = "color")]
    pub color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            timestamps: true,
            #[cfg(feature = "color")]
            color: false,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Read `TAGCACHE_*` variables and publish the level to the global
    /// filter.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let debug = env_flag("TAGCACHE_DEBUG").unwrap_or(false);

        let level = env::var("TAGCACHE_LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { defaults.level });

        let format = env::var("TAGCACHE_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.format);

        let timestamps = env_flag("TAGCACHE_LOG_TIMESTAMPS").unwrap_or(defaults.timestamps);

        DEBUG_ENABLED.store(debug, Ordering::SeqCst);
        LOG_LEVEL.store(level as u8, Ordering::SeqCst);

        Self {
            debug,
            level,
            format,
            timestamps,
            #[cfg(feature = "color")]
            color: env::var("NO_COLOR").is_err() && env::var("TERM").is_ok(),
        }
    }
}

/// Force configuration loading. Otherwise it happens on the first record.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// The resolved configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

#[inline]
pub fn is_debug_enabled() -> bool {
    init();
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    init();
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

pub fn current_level() -> Level {
    init();
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Change the minimum level at runtime.
pub fn set_level(level: Level) {
    init();
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode at runtime; enabling it lowers the level to debug.
pub fn set_debug(enabled: bool) {
    init();
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

/// Emit one record. Called by the macros.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    if !is_level_enabled(level) && !(level == Level::Debug && is_debug_enabled()) {
        return;
    }
    emit(level, target, message);
}

#[cfg(feature = "tracing")]
fn emit(level: Level, target: &str, message: &str) {
    tracing_compat::forward(level, target, message);
}

#[cfg(not(feature = "tracing"))]
fn emit(level: Level, target: &str, message: &str) {
    let line = render(config(), level, target, message);
    use std::io::Write;
    let _ = writeln!(std::io::stderr().lock(), "{}", line);
}

#[cfg_attr(feature = "tracing", allow(dead_code))]
fn render(config: &LogConfig, level: Level, target: &str, message: &str) -> String {
    match config.format {
        Format::Pretty => {
            let mut line = String::new();
            if config.timestamps {
                line.push_str(&chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f ").to_string());
            }
            line.push_str(&format!("{:5} ", level_label(config, level)));
            if !target.is_empty() {
                line.push_str(&format!("[{}] ", target));
            }
            line.push_str(message);
            line
        }
        Format::Compact => {
            let initial = level.as_str().chars().next().unwrap_or('?');
            if config.timestamps {
                format!(
                    "{} {} {}: {}",
                    chrono::Local::now().format("%H:%M:%S"),
                    initial,
                    target,
                    message
                )
            } else {
                format!("{} {}: {}", initial, target, message)
            }
        }
        Format::Json => render_json(config, level, target, message),
    }
}

#[cfg(feature = "color")]
fn level_label(config: &LogConfig, level: Level) -> String {
    use colored::Colorize;
    if !config.color {
        return level.as_str().to_string();
    }
    match level {
        Level::Trace => level.as_str().magenta().to_string(),
        Level::Debug => level.as_str().blue().to_string(),
        Level::Info => level.as_str().green().to_string(),
        Level::Warn => level.as_str().yellow().to_string(),
        Level::Error | Level::Off => level.as_str().red().bold().to_string(),
    }
}

#[cfg(not(feature = "color"))]
fn level_label(_config: &LogConfig, level: Level) -> &'static str {
    level.as_str()
}

#[cfg(feature = "json")]
fn render_json(config: &LogConfig, level: Level, target: &str, message: &str) -> String {
    #[derive(serde::Serialize)]
    struct Record<'a> {
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let record = Record {
        timestamp: config.timestamps.then(|| chrono::Utc::now().to_rfc3339()),
        level: level.as_str(),
        target,
        message,
    };
    serde_json::to_string(&record).unwrap_or_else(|_| message.to_string())
}

#[cfg(not(feature = "json"))]
fn render_json(config: &LogConfig, level: Level, target: &str, message: &str) -> String {
    let escape = |s: &str| s.escape_default().to_string();
    if config.timestamps {
        format!(
            r#"{{"timestamp":"{}","level":"{}","target":"{}","message":"{}"}}"#,
            chrono::Utc::now().to_rfc3339(),
            level.as_str(),
            escape(target),
            escape(message)
        )
    } else {
        format!(
            r#"{{"level":"{}","target":"{}","message":"{}"}}"#,
            level.as_str(),
            escape(target),
            escape(message)
        )
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:expr, target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level)
            || ($level == $crate::Level::Debug && $crate::is_debug_enabled())
        {
            $crate::log($level, $target, &format!($($arg)+));
        }
    };
    ($level:expr, $($arg:tt)+) => {
        $crate::__log_at!($level, target: module_path!(), $($arg)+)
    };
}

/// Log at trace level.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::__log_at!($crate::Level::Trace, $($arg)+) };
}

/// Log at debug level. Also enabled by `TAGCACHE_DEBUG=1`.
///
/// ```rust
/// use tagcache_log::debug;
///
/// let key = "user:1";
/// debug!("cache miss for {}", key);
/// debug!(target: "tagcache::memory", "sweep evicted {} entries", 3);
/// ```
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__log_at!($crate::Level::Debug, $($arg)+) };
}

/// Log at info level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__log_at!($crate::Level::Info, $($arg)+) };
}

/// Log at warn level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__log_at!($crate::Level::Warn, $($arg)+) };
}

/// Log at error level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__log_at!($crate::Level::Error, $($arg)+) };
}

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Forwarding into `tracing` and a subscriber that honours the
    //! `TAGCACHE_*` level.

    use super::*;

    pub(crate) fn forward(level: Level, target: &str, message: &str) {
        match level {
            Level::Trace => tracing::trace!(origin = target, "{}", message),
            Level::Debug => tracing::debug!(origin = target, "{}", message),
            Level::Info => tracing::info!(origin = target, "{}", message),
            Level::Warn => tracing::warn!(origin = target, "{}", message),
            Level::Error => tracing::error!(origin = target, "{}", message),
            Level::Off => {}
        }
    }

    /// Subscriber filtered by `RUST_LOG`, falling back to the configured
    /// level.
    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config().level.as_str().to_ascii_lowercase()));

        tracing_subscriber::registry().with(filter).with(fmt::layer())
    }
}
