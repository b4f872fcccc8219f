// Building blocks shared by the launcher and installer commands.
pub mod console;
pub mod deps;
pub mod env_file;
pub mod lock;
pub mod process;
pub mod signal;
pub mod toolchain;
