use clap::error::{ContextKind, ErrorKind};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

// CLI root definition. One subcommand per launcher mode, plus the installer.
#[derive(Parser, Debug)]
#[command(name = "confluence-launcher", version)]
#[command(about = "Launcher and installer for the Confluence scraper agent")]
#[command(after_help = "Examples:\n  \
    confluence-launcher install\n  \
    confluence-launcher interactive\n  \
    confluence-launcher scrape DOCS\n  \
    confluence-launcher query \"How do we rotate API tokens?\"\n  \
    confluence-launcher generate \"Summary of the onboarding space\"")]
pub struct Cli {
    #[command(flatten)]
    pub launcher: LauncherArgs,
    #[command(subcommand)]
    pub command: Option<AppCommand>,
}

#[derive(Subcommand, Debug)]
pub enum AppCommand {
    /// Run the application's interactive menu
    Interactive,
    /// Run the application's self-test script
    Test,
    /// Scrape a Confluence space
    Scrape {
        /// Space key to scrape
        space_key: Option<String>,
    },
    /// Ask a question about scraped content
    Query {
        /// Question text (put `--` before words starting with `-`)
        #[arg(value_name = "TEXT")]
        words: Vec<String>,
    },
    /// Generate a document from a content summary
    Generate {
        /// Content summary (put `--` before words starting with `-`)
        #[arg(value_name = "SUMMARY")]
        words: Vec<String>,
    },
    /// Show application and model status
    Status,
    /// Run the standalone LLaMA example
    Llama,
    /// List available Confluence spaces
    ListSpaces,
    /// Scrape, query and summarize a space in one go
    Workflow {
        /// Space key to run the workflow for
        space_key: Option<String>,
    },
    /// Create the virtual environment and install pinned dependencies
    Install(InstallArgs),
}

// Paths and interpreter shared by every mode. Relative paths resolve against --project-dir.
#[derive(Args, Debug, Clone)]
pub struct LauncherArgs {
    #[arg(long, global = true, env = "CONFLUENCE_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,
    #[arg(long, global = true, env = "CONFLUENCE_PYTHON", default_value = "python3")]
    pub python: PathBuf,
    #[arg(long, global = true, env = "CONFLUENCE_VENV_DIR", default_value = "venv")]
    pub venv_dir: PathBuf,
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,
    #[arg(long, global = true, default_value = ".env.example")]
    pub env_template: PathBuf,
    #[arg(long, global = true, default_value = "requirements.txt")]
    pub requirements: PathBuf,
    #[arg(long, global = true, default_value = "main.py")]
    pub app_script: PathBuf,
    #[arg(long, global = true, default_value = "test_system.py")]
    pub test_script: PathBuf,
    #[arg(long, global = true, default_value = "example_llama_usage.py")]
    pub llama_script: PathBuf,
    /// Skip the import check and requirements install
    #[arg(long, global = true, default_value_t = false)]
    pub skip_deps_check: bool,
    /// Print the command that would run and exit
    #[arg(long, global = true, default_value_t = false)]
    pub dry_run: bool,
}

impl LauncherArgs {
    pub fn in_project(&self, path: &Path) -> PathBuf {
        self.project_dir.join(path)
    }

    pub fn venv_path(&self) -> PathBuf {
        self.in_project(&self.venv_dir)
    }

    pub fn env_file_path(&self) -> PathBuf {
        self.in_project(&self.env_file)
    }

    pub fn env_template_path(&self) -> PathBuf {
        self.in_project(&self.env_template)
    }

    pub fn requirements_path(&self) -> PathBuf {
        self.in_project(&self.requirements)
    }
}

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    #[arg(long, default_value = ".install.lock")]
    pub lock_file: PathBuf,
    /// Do not install the project requirements file after the pinned packages
    #[arg(long, default_value_t = false)]
    pub skip_requirements: bool,
    /// Keep the virtual environment's bundled pip
    #[arg(long, default_value_t = false)]
    pub no_pip_upgrade: bool,
}

// How a failed parse should be reported.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseFailure {
    // --help, --version, `help`: print clap's output, exit 0.
    Informational,
    // Mode outside the supported set: show full help, exit 1.
    UnknownMode(String),
    // Anything else (bad flag value, stray argument): clap's message, exit 1.
    Invalid,
}

pub fn classify_parse_error(err: &clap::Error) -> ParseFailure {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => ParseFailure::Informational,
        ErrorKind::InvalidSubcommand => {
            let mode = err
                .get(ContextKind::InvalidSubcommand)
                .map(ToString::to_string)
                .unwrap_or_default();
            ParseFailure::UnknownMode(mode)
        }
        _ => ParseFailure::Invalid,
    }
}

pub fn render_help() -> String {
    Cli::command().render_help().to_string()
}
