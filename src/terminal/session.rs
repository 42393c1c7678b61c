//! Terminal session wrapping WezTerm's Terminal
//!
//! Provides a thin wrapper around wezterm-term's Terminal for use with egui
//! rendering.

use crate::terminal::config::LumTermConfig;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use wezterm_term::color::ColorPalette;
use wezterm_term::config::TerminalConfiguration;
use wezterm_term::{CursorPosition, Terminal, TerminalSize};

/// Writer that discards all writes (input reaches the shell through the PTY
/// writer, not through the emulator)
struct NullWriter;

impl Write for NullWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A terminal session wrapping WezTerm's terminal emulator.
///
/// All escape-sequence parsing, scrollback, and cursor state live in
/// wezterm-term; this struct only hands the emulator bytes and exposes the
/// grid for rendering.
pub struct Session {
    /// The WezTerm terminal emulator
    terminal: Arc<Mutex<Terminal>>,
    /// Color palette for rendering
    palette: ColorPalette,
}

impl Session {
    /// Create a new session with the given dimensions and scrollback depth.
    pub fn new(cols: usize, rows: usize, scrollback_lines: usize) -> Self {
        let size = TerminalSize {
            rows,
            cols,
            pixel_width: cols * 8,
            pixel_height: rows * 16,
            dpi: 96,
        };

        let config = Arc::new(LumTermConfig::new(scrollback_lines));
        let palette = config.color_palette();

        // Use NullWriter since input is handled separately via ShellPty
        let writer = Box::new(NullWriter);

        let terminal = Terminal::new(
            size,
            config,
            "LumTerm",
            env!("CARGO_PKG_VERSION"),
            writer,
        );

        Self {
            terminal: Arc::new(Mutex::new(terminal)),
            palette,
        }
    }

    /// Get the color palette
    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    /// Process bytes from PTY output
    pub fn advance_bytes(&self, data: &[u8]) {
        let mut term = self.terminal.lock();
        term.advance_bytes(data);
    }

    /// Get cursor position
    pub fn cursor_pos(&self) -> CursorPosition {
        let term = self.terminal.lock();
        term.cursor_pos()
    }

    /// Get the number of physical rows
    pub fn physical_rows(&self) -> usize {
        let term = self.terminal.lock();
        term.screen().physical_rows
    }

    /// Get the number of physical columns
    pub fn physical_cols(&self) -> usize {
        let term = self.terminal.lock();
        term.screen().physical_cols
    }

    /// Access the terminal for rendering.
    /// The callback receives a reference to the locked terminal.
    pub fn with_terminal<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Terminal) -> R,
    {
        let term = self.terminal.lock();
        f(&term)
    }

    /// Access the terminal mutably.
    pub fn with_terminal_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Terminal) -> R,
    {
        let mut term = self.terminal.lock();
        f(&mut term)
    }

    /// Resize the terminal
    pub fn resize(&self, cols: usize, rows: usize) {
        let size = TerminalSize {
            rows,
            cols,
            pixel_width: cols * 8,
            pixel_height: rows * 16,
            dpi: 96,
        };

        let mut term = self.terminal.lock();
        term.resize(size);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(80, 24, 10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new(80, 24, 1000);
        assert_eq!(session.physical_rows(), 24);
        assert_eq!(session.physical_cols(), 80);
    }

    #[test]
    fn test_session_advance_bytes() {
        let session = Session::new(80, 24, 1000);
        session.advance_bytes(b"hello\r\n");
        let first_line = session.with_terminal_mut(|term| {
            let screen = term.screen_mut();
            let line = screen.line_mut(0);
            let mut text = String::new();
            for cell in line.visible_cells() {
                text.push_str(cell.str());
            }
            text
        });
        assert!(first_line.trim_end().ends_with("hello"));
        assert!(first_line.contains("hello"));
    }

    #[test]
    fn test_session_resize() {
        let session = Session::new(80, 24, 1000);
        session.resize(120, 50);
        assert_eq!(session.physical_cols(), 120);
        assert_eq!(session.physical_rows(), 50);
    }

    #[test]
    fn test_cursor_advances_with_output() {
        let session = Session::new(80, 24, 1000);
        session.advance_bytes(b"abc");
        let cursor = session.cursor_pos();
        assert_eq!(cursor.x, 3);
        assert_eq!(cursor.y, 0);
    }
}
