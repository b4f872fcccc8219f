use crate::error::LauncherError;
use crate::shared::console;
use crate::shared::process::{CommandLine, Executor, OutputMode, run_checked};
use anyhow::Result;
use std::ffi::OsString;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

// Top-level modules the application imports at startup.
pub const REQUIRED_MODULES: [&str; 7] = [
    "crewai",
    "transformers",
    "torch",
    "atlassian",
    "dotenv",
    "bs4",
    "pandas",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepsState {
    Satisfied,
    Installed,
    // Ctrl-C arrived during the import check, so its failure says nothing.
    Interrupted,
}

pub fn import_check(python: &OsString, project_dir: &Path) -> CommandLine {
    CommandLine::new(python)
        .arg("-c")
        .arg(format!("import {}", REQUIRED_MODULES.join(", ")))
        .current_dir(project_dir)
}

// Check the interpreter can import everything; otherwise install the requirements file.
pub fn ensure_dependencies(
    executor: &mut dyn Executor,
    python: &OsString,
    project_dir: &Path,
    requirements: &Path,
    interrupted: &AtomicBool,
) -> Result<DepsState> {
    let check = executor.run(&import_check(python, project_dir), OutputMode::Capture)?;
    if interrupted.load(Ordering::SeqCst) {
        return Ok(DepsState::Interrupted);
    }
    if check.success() {
        return Ok(DepsState::Satisfied);
    }

    let reason = check
        .stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("import check failed")
        .trim()
        .to_string();
    console::warn(format!("Dependencies missing ({reason}); installing"));

    if !requirements.is_file() {
        return Err(LauncherError::MissingFile {
            what: "requirements file",
            path: requirements.to_path_buf(),
        }
        .into());
    }

    let install = CommandLine::new(python)
        .args(["-m", "pip", "install", "-r"])
        .arg(requirements)
        .current_dir(project_dir);
    run_checked(executor, &install, OutputMode::Inherit, "dependency installation")?;
    Ok(DepsState::Installed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::process::testing::ScriptedExecutor;
    use std::fs;

    fn python() -> OsString {
        OsString::from("python3")
    }

    fn idle() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn importable_modules_install_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut exec = ScriptedExecutor::new();
        let requirements = dir.path().join("req.txt");
        let state =
            ensure_dependencies(&mut exec, &python(), dir.path(), &requirements, &idle()).unwrap();
        assert_eq!(state, DepsState::Satisfied);
        assert_eq!(exec.calls.len(), 1);
        assert!(exec.rendered_calls()[0].contains("import crewai, transformers"));
    }

    #[test]
    fn failed_import_installs_requirements() {
        let dir = tempfile::tempdir().unwrap();
        let requirements = dir.path().join("requirements.txt");
        fs::write(&requirements, "crewai\n").unwrap();

        let mut exec = ScriptedExecutor::new().fail_when("import crewai");
        let state =
            ensure_dependencies(&mut exec, &python(), dir.path(), &requirements, &idle()).unwrap();
        assert_eq!(state, DepsState::Installed);

        let calls = exec.rendered_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].starts_with("python3 -m pip install -r "));
        assert!(calls[1].ends_with("requirements.txt"));
    }

    #[test]
    fn failed_install_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let requirements = dir.path().join("requirements.txt");
        fs::write(&requirements, "crewai\n").unwrap();

        let mut exec = ScriptedExecutor::new()
            .fail_when("import crewai")
            .fail_when("pip install");
        let err = ensure_dependencies(&mut exec, &python(), dir.path(), &requirements, &idle())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::CommandFailed { .. })
        ));
    }

    #[test]
    fn missing_requirements_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut exec = ScriptedExecutor::new().fail_when("import crewai");
        let requirements = dir.path().join("requirements.txt");
        let err = ensure_dependencies(&mut exec, &python(), dir.path(), &requirements, &idle())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::MissingFile { .. })
        ));
        assert_eq!(exec.calls.len(), 1);
    }

    #[test]
    fn failed_import_after_ctrl_c_installs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let requirements = dir.path().join("requirements.txt");
        fs::write(&requirements, "crewai\n").unwrap();

        let mut exec = ScriptedExecutor::new().fail_when("import crewai");
        let state = ensure_dependencies(
            &mut exec,
            &python(),
            dir.path(),
            &requirements,
            &AtomicBool::new(true),
        )
        .unwrap();
        assert_eq!(state, DepsState::Interrupted);
        assert_eq!(exec.calls.len(), 1);
    }
}
