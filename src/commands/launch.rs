use crate::args::{AppCommand, LauncherArgs};
use crate::error::LauncherError;
use crate::shared::console;
use crate::shared::deps::{DepsState, ensure_dependencies};
use crate::shared::env_file::{EnvFileState, ensure_env_file, load_unset_required_keys};
use crate::shared::process::{CommandLine, Executor, OutputMode};
use crate::shared::toolchain::{ensure_python, ensure_script, resolve_python};
use anyhow::{Result, bail};
use std::ffi::OsString;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

// A launcher mode with its argument already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    Interactive,
    Test,
    Scrape { space_key: String },
    Query { text: String },
    Generate { summary: String },
    Status,
    Llama,
    ListSpaces,
    Workflow { space_key: String },
}

impl LaunchMode {
    // Convert a parsed subcommand. A blank required argument fails before anything runs.
    pub fn from_command(command: AppCommand) -> Result<Self> {
        let mode = match command {
            AppCommand::Interactive => Self::Interactive,
            AppCommand::Test => Self::Test,
            AppCommand::Scrape { space_key } => Self::Scrape {
                space_key: required_text(space_key, "scrape", "a space key", "<space_key>")?,
            },
            AppCommand::Query { words } => Self::Query {
                text: required_text(words, "query", "query text", "\"<text>\"")?,
            },
            AppCommand::Generate { words } => Self::Generate {
                summary: required_text(words, "generate", "a content summary", "\"<summary>\"")?,
            },
            AppCommand::Status => Self::Status,
            AppCommand::Llama => Self::Llama,
            AppCommand::ListSpaces => Self::ListSpaces,
            AppCommand::Workflow { space_key } => Self::Workflow {
                space_key: required_text(space_key, "workflow", "a space key", "<space_key>")?,
            },
            AppCommand::Install(_) => bail!("install is not a launcher mode"),
        };
        Ok(mode)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Test => "test",
            Self::Scrape { .. } => "scrape",
            Self::Query { .. } => "query",
            Self::Generate { .. } => "generate",
            Self::Status => "status",
            Self::Llama => "llama",
            Self::ListSpaces => "list-spaces",
            Self::Workflow { .. } => "workflow",
        }
    }

    // Script the mode runs, relative to the project directory.
    pub fn script<'a>(&self, args: &'a LauncherArgs) -> &'a Path {
        match self {
            Self::Test => &args.test_script,
            Self::Llama => &args.llama_script,
            _ => &args.app_script,
        }
    }
}

fn required_text(
    words: impl IntoIterator<Item = String>,
    mode: &'static str,
    argument: &'static str,
    placeholder: &str,
) -> Result<String> {
    let text = words.into_iter().collect::<Vec<_>>().join(" ").trim().to_string();
    if text.is_empty() {
        return Err(LauncherError::MissingArgument {
            mode,
            argument,
            usage: format!("confluence-launcher {mode} {placeholder}"),
        }
        .into());
    }
    Ok(text)
}

// Build the exact command line for a mode.
pub fn plan_command(mode: &LaunchMode, args: &LauncherArgs, python: &OsString) -> CommandLine {
    let cmd = CommandLine::new(python)
        .arg(mode.script(args))
        .current_dir(&args.project_dir);

    match mode {
        LaunchMode::Interactive => cmd.arg("--interactive"),
        LaunchMode::Test | LaunchMode::Llama => cmd,
        LaunchMode::Scrape { space_key } => cmd.arg("--scrape-space").arg(space_key),
        LaunchMode::Query { text } => cmd.arg("--query").arg(text),
        LaunchMode::Generate { summary } => cmd.arg("--generate-doc").arg(summary),
        LaunchMode::Status => cmd.arg("--status"),
        LaunchMode::ListSpaces => cmd.arg("--list-spaces"),
        LaunchMode::Workflow { space_key } => cmd.arg("--full-workflow").arg(space_key),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    DryRun,
    Completed,
    Interrupted,
}

// Public launcher entrypoint: preflight checks, then hand the terminal to the application.
pub fn run_launch(
    args: &LauncherArgs,
    mode: &LaunchMode,
    executor: &mut dyn Executor,
    interrupted: &AtomicBool,
) -> Result<LaunchOutcome> {
    let (python, from_venv) = resolve_python(&args.python, &args.venv_path());

    if args.dry_run {
        println!("{}", plan_command(mode, args, &python));
        return Ok(LaunchOutcome::DryRun);
    }

    console::step(format!("Preparing {} mode", mode.name()));
    if from_venv {
        console::info(format!("Using virtual environment {}", args.venv_path().display()));
    }
    ensure_python(executor, &python)?;
    ensure_script(&args.project_dir, mode.script(args))?;
    if was_interrupted(interrupted) {
        return Ok(LaunchOutcome::Interrupted);
    }

    let env_file = args.env_file_path();
    match ensure_env_file(&env_file, &args.env_template_path())? {
        EnvFileState::Created => console::warn(format!(
            "Created {} from {}; edit it with your Confluence credentials",
            env_file.display(),
            args.env_template_path().display()
        )),
        EnvFileState::Existing => {}
    }
    match load_unset_required_keys(&env_file) {
        Ok(unset) if !unset.is_empty() => {
            console::warn(format!("{} does not set: {}", env_file.display(), unset.join(", ")));
        }
        Ok(_) => {}
        Err(err) => console::warn(format!("Skipping credential check: {err:#}")),
    }
    if was_interrupted(interrupted) {
        return Ok(LaunchOutcome::Interrupted);
    }

    if args.skip_deps_check {
        console::info("Skipping dependency check");
    } else {
        let requirements = args.requirements_path();
        let state =
            ensure_dependencies(executor, &python, &args.project_dir, &requirements, interrupted)?;
        if state == DepsState::Installed {
            console::success("Dependencies installed");
        }
        if was_interrupted(interrupted) {
            return Ok(LaunchOutcome::Interrupted);
        }
    }

    let cmd = plan_command(mode, args, &python);
    console::step(format!("Running {cmd}"));
    let outcome = executor.run(&cmd, OutputMode::Inherit)?;

    if was_interrupted(interrupted) {
        return Ok(LaunchOutcome::Interrupted);
    }
    if !outcome.success() {
        return Err(LauncherError::CommandFailed {
            label: format!("{} mode", mode.name()),
            status: outcome.status_text(),
            details: String::new(),
        }
        .into());
    }
    Ok(LaunchOutcome::Completed)
}

// Ctrl-C between steps stops the launch; nothing later may run.
fn was_interrupted(interrupted: &AtomicBool) -> bool {
    let seen = interrupted.load(Ordering::SeqCst);
    if seen {
        console::warn("Interrupted");
    }
    seen
}
