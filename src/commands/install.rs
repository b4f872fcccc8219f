use crate::args::{InstallArgs, LauncherArgs};
use crate::error::LauncherError;
use crate::shared::console;
use crate::shared::lock::InstallLock;
use crate::shared::process::{CommandLine, Executor, OutputMode, run_checked};
use crate::shared::toolchain::{ensure_python, venv_python};
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::Path;

// A group of exact-version requirements installed with one pip invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageStep {
    pub label: &'static str,
    pub requirements: &'static [&'static str],
}

// Install order matters: torch must land before transformers/accelerate resolve against it.
pub const PINNED_STEPS: &[PackageStep] = &[
    PackageStep {
        label: "CrewAI agent framework",
        requirements: &["crewai==0.28.8", "crewai-tools==0.1.6"],
    },
    PackageStep {
        label: "PyTorch",
        requirements: &["torch==2.1.2"],
    },
    PackageStep {
        label: "LLaMA model runtime",
        requirements: &[
            "transformers==4.36.2",
            "accelerate==0.25.0",
            "sentencepiece==0.1.99",
        ],
    },
    PackageStep {
        label: "document processing",
        requirements: &["pandas==2.1.4", "reportlab==4.0.8", "markdown==3.5.1"],
    },
    PackageStep {
        label: "Confluence client",
        requirements: &[
            "atlassian-python-api==3.41.4",
            "beautifulsoup4==4.12.2",
            "requests==2.31.0",
        ],
    },
    PackageStep {
        label: "environment loading",
        requirements: &["python-dotenv==1.0.0"],
    },
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub failed: Vec<String>,
}

impl InstallReport {
    fn record(&mut self, label: &str, result: Result<()>) {
        match result {
            Ok(()) => {
                console::success(format!("Installed {label}"));
                self.installed.push(label.to_string());
            }
            Err(err) => {
                console::warn(format!("Installing {label} failed; continuing: {err:#}"));
                self.failed.push(label.to_string());
            }
        }
    }
}

// Public installer entrypoint.
pub fn run_install(
    launcher: &LauncherArgs,
    args: &InstallArgs,
    executor: &mut dyn Executor,
) -> Result<InstallReport> {
    console::step("Checking Python toolchain");
    let base_python = launcher.python.as_os_str().to_owned();
    ensure_python(executor, &base_python)?;

    let _lock = InstallLock::acquire(&launcher.in_project(&args.lock_file))?;

    // Environment creation and activation are the only fatal stages after the toolchain check.
    let venv_dir = launcher.venv_path();
    let python = prepare_venv(executor, &base_python, &venv_dir)?;

    let mut report = InstallReport::default();
    if !args.no_pip_upgrade {
        console::step("Upgrading pip");
        let result = pip_install(executor, &python, &["--upgrade", "pip"], "pip upgrade");
        report.record("pip", result);
    }

    for (idx, step) in PINNED_STEPS.iter().enumerate() {
        console::step(format!(
            "[{}/{}] Installing {}",
            idx + 1,
            PINNED_STEPS.len(),
            step.label
        ));
        let result = pip_install(executor, &python, step.requirements, step.label);
        report.record(step.label, result);
    }

    let requirements = launcher.requirements_path();
    if !args.skip_requirements && requirements.is_file() {
        console::step(format!("Installing {}", requirements.display()));
        let cmd = CommandLine::new(&python)
            .args(["-m", "pip", "install", "-r"])
            .arg(&requirements);
        let result = run_checked(executor, &cmd, OutputMode::Inherit, "requirements install")
            .map(|_| ());
        report.record("project requirements", result);
    }

    print_summary(&report, launcher);
    Ok(report)
}

// Create the virtual environment unless one already exists, then confirm its interpreter runs.
fn prepare_venv(
    executor: &mut dyn Executor,
    base_python: &OsString,
    venv_dir: &Path,
) -> Result<OsString> {
    let interpreter = venv_python(venv_dir);
    if interpreter.is_file() {
        console::step(format!("Reusing virtual environment {}", venv_dir.display()));
    } else {
        console::step(format!("Creating virtual environment {}", venv_dir.display()));
        let cmd = CommandLine::new(base_python).args(["-m", "venv"]).arg(venv_dir);
        run_checked(executor, &cmd, OutputMode::Capture, "virtual environment creation")?;
    }

    if !interpreter.is_file() {
        return Err(LauncherError::MissingFile {
            what: "virtual environment interpreter",
            path: interpreter,
        }
        .into());
    }

    let python = interpreter.into_os_string();
    ensure_python(executor, &python).context("activating virtual environment failed")?;
    Ok(python)
}

fn pip_install(
    executor: &mut dyn Executor,
    python: &OsString,
    requirements: &[&str],
    label: &str,
) -> Result<()> {
    let cmd = CommandLine::new(python)
        .args(["-m", "pip", "install"])
        .args(requirements.iter().copied());
    run_checked(executor, &cmd, OutputMode::Inherit, label)?;
    Ok(())
}

fn print_summary(report: &InstallReport, launcher: &LauncherArgs) {
    eprintln!();
    if report.failed.is_empty() {
        console::success(format!(
            "All {} installation steps succeeded",
            report.installed.len()
        ));
    } else {
        console::warn(format!(
            "{} of {} installation steps failed: {}",
            report.failed.len(),
            report.failed.len() + report.installed.len(),
            report.failed.join(", ")
        ));
        console::info("Re-run the installer or install the failed packages manually.");
    }

    eprintln!();
    console::step("Next steps");
    if !launcher.env_file_path().exists() {
        console::info(format!(
            "1. cp {} {}",
            launcher.env_template.display(),
            launcher.env_file.display()
        ));
    } else {
        console::info(format!("1. Review {}", launcher.env_file.display()));
    }
    console::info("2. Set CONFLUENCE_URL, CONFLUENCE_USERNAME, CONFLUENCE_API_TOKEN and LLAMA_MODEL_PATH");
    console::info("3. confluence-launcher test");
    console::info("4. confluence-launcher interactive");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{AppCommand, Cli};
    use crate::shared::process::testing::ScriptedExecutor;
    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;

    fn parse(project: &Path, extra: &[&str]) -> (LauncherArgs, InstallArgs) {
        let project = project.to_string_lossy().into_owned();
        let mut argv = vec!["confluence-launcher", "--project-dir", project.as_str(), "install"];
        argv.extend_from_slice(extra);
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Some(AppCommand::Install(install)) => (cli.launcher, install),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn venv_interpreter(project: &Path) -> PathBuf {
        venv_python(&project.join("venv"))
    }

    #[test]
    fn failed_package_group_does_not_stop_later_groups() {
        let dir = tempfile::tempdir().unwrap();
        let (launcher, install) = parse(dir.path(), &[]);
        let mut exec = ScriptedExecutor::new()
            .create_on_success("-m venv", venv_interpreter(dir.path()))
            .fail_when("crewai==");

        let report = run_install(&launcher, &install, &mut exec).unwrap();
        assert_eq!(report.failed, ["CrewAI agent framework"]);
        assert_eq!(report.installed.len(), PINNED_STEPS.len());
        assert_eq!(report.installed[0], "pip");

        let calls = exec.rendered_calls();
        assert!(calls.iter().any(|c| c.contains("torch==2.1.2")));
        assert!(calls.iter().any(|c| c.contains("python-dotenv==1.0.0")));
    }

    #[test]
    fn venv_creation_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (launcher, install) = parse(dir.path(), &[]);
        let mut exec = ScriptedExecutor::new().fail_when("-m venv");

        let err = run_install(&launcher, &install, &mut exec).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::CommandFailed { .. })
        ));
        assert!(!exec.rendered_calls().iter().any(|c| c.contains("pip install")));
    }

    #[test]
    fn venv_without_interpreter_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (launcher, install) = parse(dir.path(), &[]);
        // venv "succeeds" but leaves no interpreter behind.
        let mut exec = ScriptedExecutor::new();

        let err = run_install(&launcher, &install, &mut exec).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::MissingFile { .. })
        ));
    }

    #[test]
    fn existing_venv_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = venv_interpreter(dir.path());
        fs::create_dir_all(interpreter.parent().unwrap()).unwrap();
        fs::write(&interpreter, b"").unwrap();
        fs::write(dir.path().join("requirements.txt"), "crewai\n").unwrap();

        let (launcher, install) = parse(dir.path(), &["--no-pip-upgrade"]);
        let mut exec = ScriptedExecutor::new();
        let report = run_install(&launcher, &install, &mut exec).unwrap();

        let calls = exec.rendered_calls();
        assert!(!calls.iter().any(|c| c.contains("-m venv")));
        assert!(!calls.iter().any(|c| c.contains("--upgrade pip")));
        assert!(calls.last().unwrap().contains("pip install -r"));
        assert_eq!(report.installed.len(), PINNED_STEPS.len() + 1);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn missing_python_aborts_before_anything_else() {
        let dir = tempfile::tempdir().unwrap();
        let (launcher, install) = parse(dir.path(), &[]);
        let mut exec = ScriptedExecutor::new().missing_program("python3");

        let err = run_install(&launcher, &install, &mut exec).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::MissingExecutable { .. })
        ));
        assert_eq!(exec.calls.len(), 1);
        assert!(!dir.path().join(".install.lock").exists());
    }
}
