use colored::Colorize;
use std::fmt::Display;

// Progress output goes to stderr so stdout stays reserved for the child application.

pub fn step(message: impl Display) {
    eprintln!("{} {}", "==>".cyan().bold(), message.to_string().bold());
}

pub fn info(message: impl Display) {
    eprintln!("    {message}");
}

pub fn success(message: impl Display) {
    eprintln!("{} {}", "✓".green().bold(), message.to_string().green());
}

pub fn warn(message: impl Display) {
    eprintln!("{} {}", "!".yellow().bold(), message.to_string().yellow());
}

pub fn error(message: impl Display) {
    eprintln!("{} {}", "✗".red().bold(), message.to_string().red());
}
