//! Build request for `build_afni`
//!
//! # Environment Variables
//!
//! - `BUILD_AFNI_GIT_URL`: repository to clone - default: "https://github.com/afni/afni.git"
//! - `BUILD_AFNI_GIT_BRANCH`: branch to check out - default: "master"

use std::env;
use std::path::PathBuf;

pub const DEFAULT_GIT_URL: &str = "https://github.com/afni/afni.git";
pub const DEFAULT_GIT_BRANCH: &str = "master";
pub const DEFAULT_VERB: u8 = 1;

pub const ENV_GIT_URL: &str = "BUILD_AFNI_GIT_URL";
pub const ENV_GIT_BRANCH: &str = "BUILD_AFNI_GIT_BRANCH";

/// Name of the backup prefix for replaced build directories
pub const PREV_PREFIX: &str = "prev.";
/// Build output directories backed up when an existing root is reused
pub const BUILD_DIRS: [&str; 2] = ["build_src", "build_cmake"];
/// Checkout location, relative to the root directory
pub const GIT_DIR: &str = "git";
pub const CHECKOUT_NAME: &str = "afni";
/// File the command history is saved to, inside the root directory
pub const HISTORY_FILE: &str = "cmd_history.txt";

#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub root_dir: PathBuf,
    pub abin: Option<PathBuf>,
    pub build_label: Option<String>,
    pub package: Option<String>,
    /// Pull the existing checkout (`--update-git yes`)
    pub update_git: bool,
    pub verb: u8,
    pub git_url: String,
    pub git_branch: String,
}

impl BuildConfig {
    /// A default request for `root_dir`, with git settings taken from the
    /// environment when present
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            abin: None,
            build_label: None,
            package: None,
            update_git: true,
            verb: DEFAULT_VERB,
            git_url: env_or(ENV_GIT_URL, DEFAULT_GIT_URL),
            git_branch: env_or(ENV_GIT_BRANCH, DEFAULT_GIT_BRANCH),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
