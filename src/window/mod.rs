//! Terminal window module
//!
//! Provides the GUI window displaying shell output and capturing input.

mod context_menu;
mod terminal;

pub use context_menu::{render_context_menu, ContextMenuState, MENU_ITEMS};
pub use terminal::{InputSender, TerminalAction, TerminalWindowState};
