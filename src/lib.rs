//! LumTerm
//!
//! A minimal desktop terminal-emulator window.
//!
//! # Features
//! - Spawns the user's shell behind a PTY (`portable-pty`)
//! - Delegates VT parsing, scrollback, and cursor state to `wezterm-term`
//! - Renders the cell grid with egui on a winit window
//! - Right-click context menu for clipboard copy/paste

pub mod core;
pub mod pty;
pub mod terminal;
pub mod window;

pub use crate::core::config::Config;
pub use crate::core::events::{AppEvent, EventSender};
pub use crate::core::theme::Theme;
pub use crate::pty::{ShellPty, SpawnError};
pub use crate::terminal::Session;
pub use crate::window::{TerminalAction, TerminalWindowState};
