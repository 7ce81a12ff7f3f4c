//! Logging utilities for the Kestrel command line tools.
//!
//! Log lines always go to `stderr` so that command output on `stdout`
//! stays machine readable.

use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        OnceLock,
    },
};

use color_eyre::{eyre::eyre, Report, Result};
use serde::{Deserialize, Serialize};
use tracing::subscriber::set_global_default;
pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, instrument as log, trace, trace_span,
    warn, warn_span,
};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, registry::Registry};

/// Environment variable that overrides the configured log level with a
/// full [`EnvFilter`] directive string.
pub const LOG_ENV: &str = "KESTREL_LOG";

static LOGGER_SET: AtomicBool = AtomicBool::new(false);

fn try_set_logger() -> Result<()> {
    if LOGGER_SET
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(eyre!("Logger is already set."));
    }
    Ok(())
}

/// Log level for reading from the command line and (de)serializing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize,
)]
#[allow(clippy::upper_case_acronyms)]
#[repr(u8)]
pub enum Level {
    /// Trace
    TRACE,
    /// Debug
    DEBUG,
    /// Info (Default)
    #[default]
    INFO,
    /// Warn
    WARN,
    /// Error
    ERROR,
}

impl From<Level> for tracing::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::TRACE => Self::TRACE,
            Level::DEBUG => Self::DEBUG,
            Level::INFO => Self::INFO,
            Level::WARN => Self::WARN,
            Level::ERROR => Self::ERROR,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TRACE => "trace",
            Self::DEBUG => "debug",
            Self::INFO => "info",
            Self::WARN => "warn",
            Self::ERROR => "error",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Level {
    type Err = Report;

    fn from_str(candidate: &str) -> Result<Self> {
        match candidate.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::TRACE),
            "debug" => Ok(Self::DEBUG),
            "info" => Ok(Self::INFO),
            "warn" => Ok(Self::WARN),
            "error" => Ok(Self::ERROR),
            other => Err(eyre!("unknown log level `{other}`")),
        }
    }
}

/// Reflects formatters in [`tracing_subscriber::fmt::format`]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// See [`tracing_subscriber::fmt::format::Full`]
    #[default]
    Full,
    /// See [`tracing_subscriber::fmt::format::Compact`]
    Compact,
    /// See [`tracing_subscriber::fmt::format::Pretty`]
    Pretty,
    /// See [`tracing_subscriber::fmt::format::Json`]
    Json,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Full => "full",
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Format {
    type Err = Report;

    fn from_str(candidate: &str) -> Result<Self> {
        match candidate.to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(eyre!("unknown log format `{other}`")),
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Level of logging verbosity
    pub level: Level,
    /// Output format
    pub format: Format,
}

/// Initializes the logger globally with the given [`Config`].
///
/// The [`LOG_ENV`] environment variable, when set, overrides the
/// configured level with its filter directives.
///
/// Works only once per process, all subsequent invocations will fail.
///
/// For usage in tests consider [`test_logger`].
///
/// # Errors
/// If the logger is already set, or if [`LOG_ENV`] holds directives
/// that do not parse.
pub fn init_global(configuration: &Config, terminal_colors: bool) -> Result<()> {
    try_set_logger()?;

    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(terminal_colors)
        .with_writer(std::io::stderr);

    match configuration.format {
        Format::Full => step2(configuration, layer),
        Format::Compact => step2(configuration, layer.compact()),
        Format::Pretty => step2(configuration, layer.pretty()),
        Format::Json => step2(configuration, layer.json()),
    }
}

/// Returns once lazily initialised global logger for testing purposes.
///
/// # Panics
/// If [`init_global`] was called first.
pub fn test_logger() {
    static LOGGER: OnceLock<()> = OnceLock::new();

    LOGGER.get_or_init(|| {
        // NOTE: if this config should be changed for some specific tests, consider
        // isolating those tests into a separate process and controlling default logger config
        // with ENV vars rather than by extending `test_logger` signature. This will both remain
        // `test_logger` simple and also will emphasise isolation which is necessary anyway in
        // case of singleton mocking (where the logger is the singleton).
        let config = Config {
            level: Level::DEBUG,
            format: Format::Pretty,
        };

        init_global(&config, true)
            .expect("`init_global()` should not be called before `test_logger()`")
    });
}

fn step2<L>(configuration: &Config, layer: L) -> Result<()>
where
    L: tracing_subscriber::Layer<Registry> + Send + Sync + 'static,
{
    let filter = env_or_level_filter(configuration.level)?;
    let subscriber = Registry::default().with(layer).with(filter);
    set_global_default(subscriber)?;

    Ok(())
}

fn env_or_level_filter(level: Level) -> Result<EnvFilter> {
    match std::env::var(LOG_ENV) {
        Ok(raw) => EnvFilter::try_new(&raw)
            .map_err(|err| eyre!("invalid `{LOG_ENV}` directives `{raw}`: {err}")),
        Err(_) => {
            let level_filter = tracing_core::LevelFilter::from_level(tracing::Level::from(level));
            Ok(EnvFilter::default().add_directive(level_filter.into()))
        }
    }
}

/// Installs the panic hook with [`color_eyre::install`] if it isn't installed yet
///
/// # Errors
/// Fails if [`color_eyre::install`] fails
pub fn install_panic_hook() -> Result<(), Report> {
    static INSTALLED: AtomicBool = AtomicBool::new(false);
    if INSTALLED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        color_eyre::install()
    } else {
        Ok(())
    }
}

pub mod prelude {
    //! Module with most used items. Needs to be imported when using `log` macro to avoid `tracing` crate dependency

    pub use tracing::{self, debug, error, info, instrument as log, span, trace, warn, Span};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_pretty_format_in_lowercase() {
        let value = Format::Pretty;
        let actual = serde_json::to_string(&value).unwrap();
        assert_eq!("\"pretty\"", actual);
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::WARN);
        assert_eq!("DEBUG".parse::<Level>().unwrap(), Level::DEBUG);
        assert!("chatty".parse::<Level>().is_err());
    }

    #[test]
    fn format_parse_display_round_trip() {
        for format in [Format::Full, Format::Compact, Format::Pretty, Format::Json] {
            assert_eq!(format.to_string().parse::<Format>().unwrap(), format);
        }
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, Format::Full);

        let config: Config = serde_json::from_str(r#"{"level": "ERROR", "format": "json"}"#).unwrap();
        assert_eq!(config.level, Level::ERROR);
        assert_eq!(config.format, Format::Json);
    }

    #[test]
    fn unknown_config_field_is_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"verbosity": "INFO"}"#).is_err());
    }
}
