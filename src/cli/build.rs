use super::TerminalFlags;
use crate::build::config::DEFAULT_VERB;
use crate::build::{run_build, BuildConfig, BuildReport};
use crate::error::{ToolError, ToolResult};
use crate::fs::RealFileSystem;
use crate::shell::RealShell;
use clap::{ArgAction, Parser, ValueEnum};
use std::env;
use std::path::PathBuf;

pub const HISTORY: &str = "\
build_afni history:

   0.0  initial tree preparation: back up build_src and build_cmake,
        clone or update the afni git repository, save the command history
   0.1  run the clone for real, honor --update-git, fail on any step error
";

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateGit {
    Yes,
    No,
}

/// Prepare an AFNI build tree: back up old builds, then clone or update git
#[derive(Parser, Debug, Clone)]
#[command(
    name = "build_afni",
    version,
    disable_version_flag = true,
    long_about = "Prepares a root build directory for compiling AFNI. Existing build_src and \
                  build_cmake directories are moved to prev.*, then git/afni is cloned or \
                  updated.\n\n\
                  Environment:\n  \
                  BUILD_AFNI_GIT_URL     repository to clone\n  \
                  BUILD_AFNI_GIT_BRANCH  branch to check out\n\n\
                  Examples:\n  \
                  build_afni --root-dir ~/afni_build\n  \
                  build_afni --root-dir ~/afni_build --update-git no --verb 3"
)]
pub struct BuildArgs {
    #[arg(
        long,
        value_name = "DIR",
        required_unless_present_any = ["hist", "show_valid_opts"],
        help = "Root directory to build under"
    )]
    pub root_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Directory to install binaries into")]
    pub abin: Option<PathBuf>,

    #[arg(long, value_name = "LABEL", help = "Label for this build, e.g. a git tag")]
    pub build_label: Option<String>,

    #[arg(long, value_name = "NAME", help = "Binary package to build")]
    pub package: Option<String>,

    #[arg(
        long,
        value_enum,
        value_name = "yes|no",
        default_value = "yes",
        help = "Pull the existing git checkout"
    )]
    pub update_git: UpdateGit,

    #[arg(long, value_name = "LEVEL", default_value_t = DEFAULT_VERB, help = "Verbosity level")]
    pub verb: u8,

    #[arg(long, help = "Show the modification history")]
    pub hist: bool,

    #[arg(long, help = "List all valid options")]
    pub show_valid_opts: bool,

    #[arg(long = "ver", action = ArgAction::Version, help = "Show the version")]
    pub ver: Option<bool>,
}

impl TerminalFlags for BuildArgs {
    const HISTORY: &'static str = HISTORY;

    fn wants_history(&self) -> bool {
        self.hist
    }

    fn wants_valid_opts(&self) -> bool {
        self.show_valid_opts
    }
}

impl TryFrom<&BuildArgs> for BuildConfig {
    type Error = ToolError;

    fn try_from(args: &BuildArgs) -> Result<Self, Self::Error> {
        let root_dir = args
            .root_dir
            .clone()
            .ok_or_else(|| ToolError::Usage("missing option --root-dir".to_string()))?;

        let mut config = BuildConfig::new(root_dir);
        config.abin = args.abin.clone();
        config.build_label = args.build_label.clone();
        config.package = args.package.clone();
        config.update_git = args.update_git == UpdateGit::Yes;
        config.verb = args.verb;
        Ok(config)
    }
}

/// Prepare the tree on the real disk, searching `$PATH` for programs
pub fn run(args: &BuildArgs) -> ToolResult<BuildReport> {
    let config = BuildConfig::try_from(args)?;
    run_build(&config, &RealFileSystem, &RealShell, env::var_os("PATH"))
}
