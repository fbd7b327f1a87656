//! Utility modules shared by both tools

pub mod logging;

pub use logging::{init_logging, LoggingConfig};
