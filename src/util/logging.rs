//! Structured logging setup
//!
//! Both binaries log through `tracing`. The subscriber writes to stderr so
//! that terminal output (`--hist`, `--show-valid-opts`, the verbose command
//! history) stays clean on stdout.
//!
//! The level comes from the tools' `--verb` option; `RUST_LOG`, when set, is
//! layered on top and wins for any target it names.
//!
//! # Example
//!
//! ```no_run
//! use afni_tools::util::{init_logging, LoggingConfig};
//!
//! init_logging(LoggingConfig::from_verb(2));
//! tracing::debug!(root = "/data/afni_build", "planning build");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format
    pub use_json: bool,

    /// Include the module target (e.g., afni_tools::build) in logs
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Map a `--verb` level to a log configuration
    ///
    /// 0 is quiet (warnings and errors only), 1 is the normal progress
    /// messages, 2 adds debug detail and 3 or more traces every process spawn.
    /// Module targets are shown from level 2 up.
    pub fn from_verb(verb: u8) -> Self {
        let level = level_for_verb(verb);
        let use_json = env::var("AFNI_TOOLS_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            level,
            use_json,
            include_target: verb >= 2,
        }
    }
}

pub fn level_for_verb(verb: u8) -> Level {
    match verb {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initializes the logging system with the provided configuration
///
/// Can only be called once - subsequent calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .without_time()
                        .with_target(config.include_target)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}

fn build_filter(level: Level) -> EnvFilter {
    let directive = format!("afni_tools={}", level);
    let base = EnvFilter::builder().with_default_directive(LevelFilter::from_level(level).into());

    match env::var("RUST_LOG") {
        Ok(extra) if !extra.trim().is_empty() => base.parse_lossy(format!("{},{}", directive, extra)),
        _ => base.parse_lossy(directive),
    }
}
