//! Command-line front ends shared by both binaries
//!
//! Parsing never exits the process: terminal flags (`--help`, `--ver`,
//! `--hist`, `--show-valid-opts`) come back as [`Invocation::Terminal`] with
//! the text to print, and every other clap failure becomes a usage error.

pub mod build;
pub mod decon;

pub use build::{BuildArgs, UpdateGit};
pub use decon::DeconArgs;

use crate::error::{ToolError, ToolResult};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;

/// Result of reading the command line
#[derive(Debug)]
pub enum Invocation<A> {
    Run(A),
    /// Informational flag given; print this and exit successfully
    Terminal(String),
}

/// Informational flags every tool carries next to `--help` and `--ver`
pub trait TerminalFlags: CommandFactory {
    /// Modification history shown by `--hist`
    const HISTORY: &'static str;

    fn wants_history(&self) -> bool;
    fn wants_valid_opts(&self) -> bool;

    fn terminal_text(&self) -> Option<String> {
        if self.wants_history() {
            Some(Self::HISTORY.to_string())
        } else if self.wants_valid_opts() {
            Some(valid_opts::<Self>())
        } else {
            None
        }
    }
}

pub fn parse_invocation<A, I, T>(argv: I) -> ToolResult<Invocation<A>>
where
    A: Parser + TerminalFlags,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match A::try_parse_from(argv) {
        Ok(args) => Ok(match args.terminal_text() {
            Some(text) => Invocation::Terminal(text),
            None => Invocation::Run(args),
        }),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                Ok(Invocation::Terminal(err.to_string()))
            }
            _ => Err(usage_error(&err)),
        },
    }
}

fn usage_error(err: &clap::Error) -> ToolError {
    let text = err.to_string();
    let text = text.trim_end();
    ToolError::Usage(text.strip_prefix("error: ").unwrap_or(text).to_string())
}

/// One line per long flag: name and help text
pub fn valid_opts<A: CommandFactory>() -> String {
    let mut cmd = A::command();
    cmd.build();

    let mut out = format!("valid options for {}:\n", cmd.get_name());
    for arg in cmd.get_arguments() {
        if let Some(long) = arg.get_long() {
            let help = arg.get_help().map(|h| h.to_string()).unwrap_or_default();
            out.push_str(&format!("   --{:<18} {}\n", long, help));
        }
    }
    out
}

/// Print a failure the way both tools do and pick the exit status
pub fn report_error(err: &ToolError) -> i32 {
    eprintln!("** error: {}", err);
    err.exit_code()
}
