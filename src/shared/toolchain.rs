use crate::error::LauncherError;
use crate::shared::console;
use crate::shared::process::{CommandLine, Executor, OutputMode, run_checked};
use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

// Interpreter location inside a virtual environment, per platform layout.
pub fn venv_python(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts").join("python.exe")
    } else {
        venv_dir.join("bin").join("python")
    }
}

// Prefer the project's virtual environment, which is what "activating" it amounts to.
// Falls back to the configured interpreter (looked up on PATH when not a path).
pub fn resolve_python(configured: &Path, venv_dir: &Path) -> (OsString, bool) {
    let candidate = venv_python(venv_dir);
    if candidate.is_file() {
        return (candidate.into_os_string(), true);
    }
    (configured.as_os_str().to_owned(), false)
}

// Verify the interpreter starts and report its version.
pub fn ensure_python(executor: &mut dyn Executor, python: &OsString) -> Result<String> {
    let cmd = CommandLine::new(python).arg("--version");
    let outcome = run_checked(executor, &cmd, OutputMode::Capture, "python availability check")?;

    // Older interpreters print the version on stderr.
    let version = if outcome.stdout.trim().is_empty() {
        outcome.stderr.trim().to_string()
    } else {
        outcome.stdout.trim().to_string()
    };
    if !version.is_empty() {
        console::info(format!("Using {version} ({})", Path::new(python).display()));
    }
    Ok(version)
}

pub fn ensure_script(project_dir: &Path, script: &Path) -> Result<PathBuf> {
    let path = project_dir.join(script);
    if !path.is_file() {
        return Err(LauncherError::MissingFile {
            what: "application script",
            path,
        }
        .into());
    }
    Ok(path)
}
