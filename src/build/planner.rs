//! Decide what has to happen under the root build directory
//!
//! Planning is split from execution: [`RootSnapshot::capture`] looks at the
//! disk once, then [`plan`] turns that snapshot into an ordered list of
//! [`Step`]s without touching anything.

use super::config::{BuildConfig, BUILD_DIRS, CHECKOUT_NAME, GIT_DIR, PREV_PREFIX};
use super::directory::DirectoryRecord;
use super::executor::Step;
use crate::error::{ToolError, ToolResult};
use crate::fs::FileSystem;
use crate::shell::find_in_path;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Programs the build cannot run without
pub const REQUIRED_PROGRAMS: [&str; 2] = ["git", "make"];
/// Program whose location identifies the current AFNI binaries directory
pub const ABIN_MARKER: &str = "afni_proc.py";

/// A build output directory and its backup slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirState {
    pub current: DirectoryRecord,
    pub previous: DirectoryRecord,
}

impl BuildDirState {
    pub fn name(&self) -> &str {
        &self.current.tail
    }

    pub fn backup_name(&self) -> &str {
        &self.previous.tail
    }
}

/// Everything the planner needs to know about the root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSnapshot {
    pub root: DirectoryRecord,
    pub build_dirs: Vec<BuildDirState>,
    pub git: DirectoryRecord,
    pub checkout: DirectoryRecord,
}

impl RootSnapshot {
    pub fn capture(fs: &dyn FileSystem, root_dir: &Path) -> ToolResult<Self> {
        let root = DirectoryRecord::snapshot(fs, "root_dir", root_dir)?;
        let under = |name: &str, rel: &str| DirectoryRecord::snapshot(fs, name, root.abspath.join(rel));

        let mut build_dirs = Vec::with_capacity(BUILD_DIRS.len());
        for dir in BUILD_DIRS {
            let backup = format!("{}{}", PREV_PREFIX, dir);
            build_dirs.push(BuildDirState {
                current: under(dir, dir)?,
                previous: under(&backup, &backup)?,
            });
        }

        let git = under("git_dir", GIT_DIR)?;
        let checkout = under("afni_repo", &format!("{}/{}", GIT_DIR, CHECKOUT_NAME))?;

        Ok(Self {
            root,
            build_dirs,
            git,
            checkout,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub step: Step,
    /// Progress message shown before the step runs
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    steps: Vec<PlannedStep>,
}

impl BuildPlan {
    fn push(&mut self, step: Step) {
        self.steps.push(PlannedStep { step, note: None });
    }

    fn push_noted(&mut self, step: Step, note: impl Into<String>) {
        self.steps.push(PlannedStep {
            step,
            note: Some(note.into()),
        });
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Plain step list, mostly for assertions
    pub fn bare_steps(&self) -> Vec<Step> {
        self.steps.iter().map(|p| p.step.clone()).collect()
    }
}

pub fn plan(config: &BuildConfig, snapshot: &RootSnapshot) -> BuildPlan {
    let mut plan = BuildPlan::default();
    let root = &snapshot.root;

    if root.exists {
        clean_old_root(&mut plan, snapshot);
    } else {
        plan.push_noted(
            Step::MakeDir(root.abspath.clone()),
            format!("creating root dir, {}", root.path.display()),
        );
    }
    prepare_root(&mut plan, config, snapshot);

    plan
}

/// Move existing build outputs aside as `prev.*`, replacing older backups
fn clean_old_root(plan: &mut BuildPlan, snapshot: &RootSnapshot) {
    let root = &snapshot.root;
    plan.push_noted(
        Step::ChangeDir(root.abspath.clone()),
        format!("cleaning old root dir, {}", root.path.display()),
    );

    for dir in snapshot.build_dirs.iter().filter(|d| d.current.exists) {
        let mut note = Some(format!("backing up dir {}", dir.name()));
        if dir.previous.exists {
            plan.push_noted(
                Step::Remove(PathBuf::from(dir.backup_name())),
                note.take().unwrap_or_default(),
            );
        }
        let step = Step::Move {
            from: PathBuf::from(dir.name()),
            to: PathBuf::from(dir.backup_name()),
        };
        match note {
            Some(note) => plan.push_noted(step, note),
            None => plan.push(step),
        }
    }
}

/// Make sure `git/afni` is present and current
fn prepare_root(plan: &mut BuildPlan, config: &BuildConfig, snapshot: &RootSnapshot) {
    let root = &snapshot.root;
    plan.push_noted(
        Step::ChangeDir(root.abspath.clone()),
        format!("preparing root dir, {}", root.path.display()),
    );

    if snapshot.checkout.exists {
        plan.push(Step::ChangeDir(
            Path::new(GIT_DIR).join(CHECKOUT_NAME),
        ));
        let checkout = Step::shell("git", &["checkout", config.git_branch.as_str()]);
        if config.update_git {
            plan.push(checkout);
            plan.push_noted(
                Step::shell("git", &["pull"]),
                "running 'git pull' in afni repo...",
            );
        } else {
            plan.push_noted(checkout, "skipping 'git pull', using current repo");
        }
    } else {
        if !snapshot.git.exists {
            plan.push(Step::MakeDir(PathBuf::from(GIT_DIR)));
        }
        plan.push(Step::ChangeDir(PathBuf::from(GIT_DIR)));
        plan.push_noted(
            Step::shell("git", &["clone", config.git_url.as_str()]),
            "running 'git clone' on afni repo (please be patient)",
        );
    }

    plan.push(Step::ChangeDir(root.abspath.clone()));
}

/// Fail unless every required system program is on the search path
pub fn check_prerequisites(path_var: Option<OsString>) -> ToolResult<()> {
    let missing: Vec<&str> = REQUIRED_PROGRAMS
        .iter()
        .copied()
        .filter(|prog| find_in_path(prog, path_var.clone()).is_none())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ToolError::Config(format!(
            "missing system program(s): {}",
            missing.join(", ")
        )))
    }
}

/// Directory holding the AFNI binaries currently on the search path
pub fn find_abin(path_var: Option<OsString>) -> Option<PathBuf> {
    find_in_path(ABIN_MARKER, path_var).and_then(|p| p.parent().map(Path::to_path_buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use std::fs;
    use tempfile::TempDir;

    fn config() -> BuildConfig {
        let mut config = BuildConfig::new("/data/afni_build");
        config.git_url = "https://github.com/afni/afni.git".into();
        config.git_branch = "master".into();
        config
    }

    fn snapshot(fs: &MockFileSystem) -> RootSnapshot {
        RootSnapshot::capture(fs, Path::new("/data/afni_build")).unwrap()
    }

    fn cd(path: &str) -> Step {
        Step::ChangeDir(path.into())
    }

    #[test]
    fn test_fresh_root_is_created_then_cloned() {
        let fs = MockFileSystem::with_root("/home".into());
        let plan = plan(&config(), &snapshot(&fs));

        assert_eq!(
            plan.bare_steps(),
            vec![
                Step::MakeDir("/data/afni_build".into()),
                cd("/data/afni_build"),
                Step::MakeDir("git".into()),
                cd("git"),
                Step::shell("git", &["clone", "https://github.com/afni/afni.git"]),
                cd("/data/afni_build"),
            ]
        );
    }

    #[test]
    fn test_existing_root_backs_up_build_dirs() {
        let fs = MockFileSystem::with_root("/home".into());
        fs.add_dir("/data/afni_build/build_src");
        fs.add_dir("/data/afni_build/build_cmake");
        fs.add_dir("/data/afni_build/prev.build_cmake");
        fs.add_dir("/data/afni_build/git/afni");

        let plan = plan(&config(), &snapshot(&fs));
        assert_eq!(
            plan.bare_steps(),
            vec![
                cd("/data/afni_build"),
                Step::Move {
                    from: "build_src".into(),
                    to: "prev.build_src".into()
                },
                Step::Remove("prev.build_cmake".into()),
                Step::Move {
                    from: "build_cmake".into(),
                    to: "prev.build_cmake".into()
                },
                cd("/data/afni_build"),
                cd("git/afni"),
                Step::shell("git", &["checkout", "master"]),
                Step::shell("git", &["pull"]),
                cd("/data/afni_build"),
            ]
        );
    }

    #[test]
    fn test_backup_note_is_shown_once_per_dir() {
        let fs = MockFileSystem::with_root("/home".into());
        fs.add_dir("/data/afni_build/build_cmake");
        fs.add_dir("/data/afni_build/prev.build_cmake");

        let plan = plan(&config(), &snapshot(&fs));
        let notes: Vec<&str> = plan
            .steps()
            .iter()
            .filter_map(|p| p.note.as_deref())
            .filter(|n| n.starts_with("backing up"))
            .collect();
        assert_eq!(notes, vec!["backing up dir build_cmake"]);
    }

    #[test]
    fn test_existing_git_dir_is_not_recreated() {
        let fs = MockFileSystem::with_root("/home".into());
        fs.add_dir("/data/afni_build/git");

        let steps = plan(&config(), &snapshot(&fs)).bare_steps();
        assert!(!steps.contains(&Step::MakeDir("git".into())));
        assert!(steps.contains(&Step::shell(
            "git",
            &["clone", "https://github.com/afni/afni.git"]
        )));
    }

    #[test]
    fn test_no_pull_when_update_disabled() {
        let fs = MockFileSystem::with_root("/home".into());
        fs.add_dir("/data/afni_build/git/afni");
        let mut config = config();
        config.update_git = false;
        config.git_branch = "develop".into();

        let plan = plan(&config, &snapshot(&fs));
        let steps = plan.bare_steps();

        assert!(steps.contains(&Step::shell("git", &["checkout", "develop"])));
        assert!(!steps.contains(&Step::shell("git", &["pull"])));
        assert!(!steps.iter().any(|s| s.to_string().contains("clone")));
        assert!(plan
            .steps()
            .iter()
            .any(|p| p.note.as_deref() == Some("skipping 'git pull', using current repo")));
    }

    #[test]
    fn test_relative_root_resolves_against_cwd() {
        let fs = MockFileSystem::with_root("/home/user".into());
        let snapshot = RootSnapshot::capture(&fs, Path::new("afni_build")).unwrap();

        assert_eq!(snapshot.root.abspath, PathBuf::from("/home/user/afni_build"));
        assert_eq!(
            snapshot.checkout.abspath,
            PathBuf::from("/home/user/afni_build/git/afni")
        );
        assert_eq!(snapshot.build_dirs[0].backup_name(), "prev.build_src");
    }

    #[cfg(unix)]
    fn fake_program(dir: &Path, name: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_check_prerequisites() {
        let bin = TempDir::new().unwrap();
        fake_program(bin.path(), "git");

        let err = check_prerequisites(Some(bin.path().into())).unwrap_err();
        assert!(matches!(err, ToolError::Config(_)));
        assert!(err.to_string().contains("make"));
        assert!(!err.to_string().contains("git"));

        fake_program(bin.path(), "make");
        assert!(check_prerequisites(Some(bin.path().into())).is_ok());
    }

    #[test]
    fn test_check_prerequisites_without_path() {
        assert!(check_prerequisites(None).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_abin() {
        let abin = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        fake_program(abin.path(), ABIN_MARKER);

        let path_var = std::env::join_paths([empty.path(), abin.path()]).unwrap();
        assert_eq!(find_abin(Some(path_var)), Some(abin.path().to_path_buf()));
        assert_eq!(find_abin(Some(empty.path().into())), None);
    }
}
