use std::path::PathBuf;
use thiserror::Error;

// Failure kinds the launcher and installer distinguish when reporting.
// Everything else travels as plain anyhow context.
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("required executable not found: {program}")]
    MissingExecutable { program: String },

    #[error("{what} not found: {}", .path.display())]
    MissingFile { what: &'static str, path: PathBuf },

    #[error("{label} failed with {status}{details}")]
    CommandFailed {
        label: String,
        status: String,
        details: String,
    },

    #[error("{mode} requires {argument}")]
    MissingArgument {
        mode: &'static str,
        argument: &'static str,
        usage: String,
    },
}

impl LauncherError {
    // Usage line to print after the error, if this failure came from a bad invocation.
    pub fn usage(&self) -> Option<&str> {
        match self {
            Self::MissingArgument { usage, .. } => Some(usage),
            _ => None,
        }
    }
}
