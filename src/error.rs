//! Error taxonomy shared by both tools
//!
//! Infrastructure seams ([`crate::fs::FileSystem`], [`crate::shell::ShellRunner`])
//! report failures as `anyhow::Error`; components translate those into a
//! [`ToolError`] variant at their boundary so the binaries can pick an exit
//! status and print a single diagnostic line.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type ToolResult<T> = Result<T, ToolError>;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Bad, missing or unknown command-line flags
    #[error("{0}")]
    Usage(String),

    /// Options parsed, but the combination makes no sense
    #[error("configuration error: {0}")]
    Config(String),

    /// Input data could not be classified or queried
    #[error("data error: {0}")]
    Data(String),

    /// A script or history file could not be written
    #[error("failed to write {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// An external command or filesystem operation failed
    #[error("failed step '{step}' (status {status}){}", format_output(output))]
    Execution {
        step: String,
        status: i32,
        output: String,
    },
}

fn format_output(output: &str) -> String {
    let trimmed = output.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl ToolError {
    pub fn io(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        ToolError::Io {
            path: path.into(),
            message: format!("{:#}", err),
        }
    }

    /// Process exit status for this error
    ///
    /// Usage errors follow clap's convention of 2, everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::Usage(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ToolError::Usage("bad".into()).exit_code(), 2);
        assert_eq!(ToolError::Config("bad".into()).exit_code(), 1);
        assert_eq!(ToolError::Data("bad".into()).exit_code(), 1);
        assert_eq!(
            ToolError::Execution {
                step: "git pull".into(),
                status: 128,
                output: String::new(),
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_execution_display_includes_output() {
        let err = ToolError::Execution {
            step: "git pull".into(),
            status: 1,
            output: "fatal: not a git repository\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed step 'git pull' (status 1): fatal: not a git repository"
        );

        let quiet = ToolError::Execution {
            step: "mkdir git".into(),
            status: 1,
            output: String::new(),
        };
        assert_eq!(quiet.to_string(), "failed step 'mkdir git' (status 1)");
    }

    #[test]
    fn test_io_keeps_context_chain() {
        let err = anyhow!("permission denied").context("Failed to write script");
        let tool = ToolError::io("/ro/script.txt", &err);
        let msg = tool.to_string();
        assert!(msg.contains("/ro/script.txt"));
        assert!(msg.contains("Failed to write script"));
        assert!(msg.contains("permission denied"));
    }
}
