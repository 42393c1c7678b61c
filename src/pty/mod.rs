//! PTY module - shell process wrapper

mod shell;

pub use shell::{ShellPty, SpawnError};
