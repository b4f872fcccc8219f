// Command implementations split by subcommand group.
pub mod install;
pub mod launch;

pub use install::run_install;
pub use launch::{LaunchMode, run_launch};
