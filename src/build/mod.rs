//! `build_afni`: prepare an AFNI build tree
//!
//! A run checks for the required system programs, snapshots the root
//! directory, plans the backup and git steps, then executes them in order.
//! Whatever was attempted is saved to `<root>/cmd_history.txt`, also when a
//! step fails.

pub mod config;
pub mod directory;
pub mod executor;
pub mod planner;

pub use config::BuildConfig;
pub use directory::DirectoryRecord;
pub use executor::{CommandExecutor, CommandHistory, Step};
pub use planner::{plan, BuildPlan, PlannedStep, RootSnapshot};

use self::config::HISTORY_FILE;
use crate::error::ToolResult;
use crate::fs::FileSystem;
use crate::shell::ShellRunner;
use chrono::Local;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, info, trace, warn};

/// What a finished run left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub history: CommandHistory,
    pub history_file: Option<PathBuf>,
}

/// Run the whole build preparation
///
/// `path_var` is the program search path (normally `$PATH`).
pub fn run_build(
    config: &BuildConfig,
    fs: &dyn FileSystem,
    shell: &dyn ShellRunner,
    path_var: Option<OsString>,
) -> ToolResult<BuildReport> {
    match planner::find_abin(path_var.clone()) {
        Some(abin) => debug!(abin = %abin.display(), "have original abin"),
        None => debug!("no {} in PATH to set original abin from", planner::ABIN_MARKER),
    }
    planner::check_prerequisites(path_var)?;

    trace!(
        root = %config.root_dir.display(),
        abin = ?config.abin,
        package = ?config.package,
        build_label = ?config.build_label,
        git_url = %config.git_url,
        git_branch = %config.git_branch,
        "ready to process"
    );

    let snapshot = RootSnapshot::capture(fs, &config.root_dir)?;
    let plan = planner::plan(config, &snapshot);
    debug!(steps = plan.len(), root_exists = snapshot.root.exists, "planned build");

    let mut executor = CommandExecutor::new(fs, shell)?;
    let result = executor.run_plan(&plan);
    let history = executor.into_history();

    if config.verb > 2 && !history.is_empty() {
        print!("{}", history.render(Local::now()));
    }

    let root = &snapshot.root.abspath;
    let saved = if fs.is_dir(root) {
        history.save(fs, root, HISTORY_FILE, Local::now())
    } else {
        Ok(None)
    };

    // a failed step is the error worth reporting
    let history_file = match (result, saved) {
        (Err(err), Err(save_err)) => {
            warn!("could not save command history: {}", save_err);
            return Err(err);
        }
        (Err(err), Ok(_)) => return Err(err),
        (Ok(()), saved) => saved?,
    };

    info!(root = %root.display(), "build tree is ready");
    Ok(BuildReport {
        history,
        history_file,
    })
}
