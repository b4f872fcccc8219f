use crate::error::LauncherError;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

// A fully-resolved external command: program, argument vector and working directory.
// Kept separate from std::process::Command so it can be rendered, compared and faked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|arg| arg.as_ref().to_owned()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = self.working_dir() {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for CommandLine {
    // Render as a copy-pasteable POSIX shell line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

fn shell_quote(raw: &str) -> Cow<'_, str> {
    let is_plain = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:,@+%".contains(c));
    if is_plain {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(format!("'{}'", raw.replace('\'', r"'\''")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    // Child shares our terminal (interactive app, pip progress).
    Inherit,
    // Child output is collected for version checks and error reports.
    Capture,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Outcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "termination by signal".to_string(),
        }
    }
}

// Seam between command planning and actually spawning processes.
pub trait Executor {
    fn run(&mut self, cmd: &CommandLine, mode: OutputMode) -> Result<Outcome>;
}

pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&mut self, cmd: &CommandLine, mode: OutputMode) -> Result<Outcome> {
        let mut command = cmd.to_command();
        let result = match mode {
            OutputMode::Inherit => command.status().map(|status| Outcome {
                code: status.code(),
                ..Outcome::default()
            }),
            OutputMode::Capture => command.stdin(Stdio::null()).output().map(|output| Outcome {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(LauncherError::MissingExecutable {
                    program: cmd.program().to_string_lossy().into_owned(),
                }
                .into())
            }
            Err(err) => Err(err).with_context(|| format!("spawning command failed: {cmd}")),
        }
    }
}

// Run a command and turn a non-zero exit into a CommandFailed error carrying any captured output.
pub fn run_checked(
    executor: &mut dyn Executor,
    cmd: &CommandLine,
    mode: OutputMode,
    label: &str,
) -> Result<Outcome> {
    let outcome = executor.run(cmd, mode)?;
    if outcome.success() {
        return Ok(outcome);
    }

    let mut details = String::new();
    let stdout = outcome.stdout.trim();
    let stderr = outcome.stderr.trim();
    if !stdout.is_empty() {
        details.push_str(&format!("\nstdout:\n{stdout}"));
    }
    if !stderr.is_empty() {
        details.push_str(&format!("\nstderr:\n{stderr}"));
    }

    Err(LauncherError::CommandFailed {
        label: label.to_string(),
        status: outcome.status_text(),
        details,
    }
    .into())
}

#[cfg(test)]
pub mod testing {
    use super::{CommandLine, Executor, Outcome, OutputMode};
    use crate::error::LauncherError;
    use anyhow::Result;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    // Records every command and answers from a script keyed on substrings of the rendered line.
    #[derive(Default)]
    pub struct ScriptedExecutor {
        pub calls: Vec<CommandLine>,
        failing: Vec<String>,
        missing: Vec<String>,
        creates: Vec<(String, PathBuf)>,
        stdout: Vec<(String, String)>,
        interrupts: Vec<(String, Arc<AtomicBool>)>,
    }

    impl ScriptedExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_when(mut self, needle: &str) -> Self {
            self.failing.push(needle.to_string());
            self
        }

        pub fn missing_program(mut self, program: &str) -> Self {
            self.missing.push(program.to_string());
            self
        }

        pub fn create_on_success(mut self, needle: &str, path: PathBuf) -> Self {
            self.creates.push((needle.to_string(), path));
            self
        }

        pub fn stdout_for(mut self, needle: &str, stdout: &str) -> Self {
            self.stdout.push((needle.to_string(), stdout.to_string()));
            self
        }

        // Behave like Ctrl-C arriving while the matching command runs.
        pub fn interrupt_when(mut self, needle: &str, flag: Arc<AtomicBool>) -> Self {
            self.interrupts.push((needle.to_string(), flag));
            self
        }

        pub fn rendered_calls(&self) -> Vec<String> {
            self.calls.iter().map(ToString::to_string).collect()
        }
    }

    impl Executor for ScriptedExecutor {
        fn run(&mut self, cmd: &CommandLine, _mode: OutputMode) -> Result<Outcome> {
            self.calls.push(cmd.clone());
            let program = cmd.program().to_string_lossy().into_owned();
            if self.missing.contains(&program) {
                return Err(LauncherError::MissingExecutable { program }.into());
            }

            let line = cmd.to_string();
            if let Some((_, flag)) = self
                .interrupts
                .iter()
                .find(|(needle, _)| line.contains(needle.as_str()))
            {
                flag.store(true, Ordering::SeqCst);
                return Ok(Outcome {
                    code: None,
                    ..Outcome::default()
                });
            }
            if self.failing.iter().any(|needle| line.contains(needle.as_str())) {
                return Ok(Outcome {
                    code: Some(1),
                    stderr: format!("scripted failure: {line}"),
                    ..Outcome::default()
                });
            }

            for (needle, path) in &self.creates {
                if line.contains(needle.as_str()) {
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(path, b"")?;
                }
            }

            let stdout = self
                .stdout
                .iter()
                .find(|(needle, _)| line.contains(needle.as_str()))
                .map(|(_, out)| out.clone())
                .unwrap_or_default();
            Ok(Outcome {
                code: Some(0),
                stdout,
                ..Outcome::default()
            })
        }
    }
}
