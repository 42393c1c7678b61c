//! Terminal configuration for WezTerm's Terminal
//!
//! Implements the TerminalConfiguration trait required by wezterm-term.

use crate::core::theme::Theme;
use wezterm_term::color::ColorPalette;
use wezterm_term::config::TerminalConfiguration;

/// Configuration for the embedded terminal emulator.
#[derive(Debug, Clone)]
pub struct LumTermConfig {
    /// Number of lines to keep in scrollback buffer
    pub scrollback_size: usize,
    /// Color palette for this terminal
    palette: ColorPalette,
}

impl LumTermConfig {
    /// Create a new config with the given scrollback size and the fixed theme palette
    pub fn new(scrollback_size: usize) -> Self {
        Self {
            scrollback_size,
            palette: Theme.to_color_palette(),
        }
    }
}

impl Default for LumTermConfig {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl TerminalConfiguration for LumTermConfig {
    fn scrollback_size(&self) -> usize {
        self.scrollback_size
    }

    fn color_palette(&self) -> ColorPalette {
        self.palette.clone()
    }
}
