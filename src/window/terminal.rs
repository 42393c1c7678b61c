//! Terminal window using egui with WezTerm's terminal emulation
//!
//! Uses wezterm-term for full terminal emulation including escape sequence
//! parsing, cursor handling and scrollback; this module renders the grid and
//! forwards input.

use arboard::Clipboard;

use crate::core::config::WindowConfig;
use crate::core::theme::Theme;
use crate::terminal::Session;
use egui_glow::EguiGlow;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextAttributesBuilder, PossiblyCurrentContext};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use glutin_winit::DisplayBuilder;
use parking_lot::Mutex;
use raw_window_handle::HasWindowHandle;
use std::cell::Cell;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use wezterm_cell::color::ColorAttribute;
use wezterm_surface::CursorShape;
use wezterm_term::color::ColorPalette;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Modifiers, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, KeyCode, NamedKey, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use super::context_menu::{render_context_menu, ContextMenuState};

/// Inner margin around the terminal grid in logical pixels
const PADDING: f32 = 8.0;

/// Convert ColorAttribute to egui Color32 using the provided palette
fn color_attr_to_egui(
    attr: ColorAttribute,
    palette: &ColorPalette,
    is_foreground: bool,
) -> egui::Color32 {
    let srgba = if is_foreground {
        palette.resolve_fg(attr)
    } else {
        palette.resolve_bg(attr)
    };
    egui::Color32::from_rgb(
        (srgba.0 * 255.0) as u8,
        (srgba.1 * 255.0) as u8,
        (srgba.2 * 255.0) as u8,
    )
}

/// Channel for sending input to PTY
pub type InputSender = mpsc::UnboundedSender<Vec<u8>>;

/// Callback type for PTY resize notifications
pub type ResizeCallback = Box<dyn Fn(u16, u16) + Send + Sync>;

/// Actions that can be triggered from the terminal UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalAction {
    /// Copy the current selection to the clipboard
    Copy,
    /// Paste clipboard text into the terminal
    Paste,
}

/// Terminal window state managed within the main app
pub struct TerminalWindowState {
    /// Window handle
    pub window: Option<Arc<Window>>,
    /// OpenGL context
    gl_context: Option<PossiblyCurrentContext>,
    /// OpenGL surface
    gl_surface: Option<Surface<WindowSurface>>,
    /// Glow context
    glow_context: Option<Arc<glow::Context>>,
    /// Egui integration
    egui_glow: Option<EguiGlow>,
    /// The embedded terminal session
    session: Option<Arc<Mutex<Session>>>,
    /// Sender for shell input bytes
    pty_input_tx: Option<InputSender>,
    /// Color theme
    theme: Theme,
    /// Window ID (when created)
    window_id: Option<WindowId>,
    /// Callback to notify PTY of resize
    resize_callback: Option<ResizeCallback>,
    /// Current scroll offset (0 = bottom, positive = viewing history)
    scroll_offset: Arc<AtomicI32>,
    /// Current keyboard modifiers state
    modifiers: Modifiers,
    /// Cached character width for resize calculations (Cell for interior mutability)
    cached_char_width: Cell<f32>,
    /// Cached line height for resize calculations (Cell for interior mutability)
    cached_line_height: Cell<f32>,
    /// Font size in points
    font_size: f32,
    /// Selection start position (row, col) in terminal coordinates
    selection_start: Option<(i64, usize)>,
    /// Selection end position (row, col) in terminal coordinates
    selection_end: Option<(i64, usize)>,
    /// Whether mouse is currently dragging for selection
    is_selecting: bool,
    /// Current cursor position in logical pixels
    cursor_position: Option<(f64, f64)>,
    /// Right-click context menu state
    context_menu: ContextMenuState,
    /// Pending actions to be processed by the main app
    pending_actions: Vec<TerminalAction>,
}

impl TerminalWindowState {
    pub fn new(font_size: f32) -> Self {
        // Estimate initial metrics based on font size (calibrated on first render)
        let estimated_char_width = font_size * 0.6;
        let estimated_line_height = font_size * 1.3;

        Self {
            window: None,
            gl_context: None,
            gl_surface: None,
            glow_context: None,
            egui_glow: None,
            session: None,
            pty_input_tx: None,
            theme: Theme,
            window_id: None,
            resize_callback: None,
            scroll_offset: Arc::new(AtomicI32::new(0)),
            modifiers: Modifiers::default(),
            cached_char_width: Cell::new(estimated_char_width),
            cached_line_height: Cell::new(estimated_line_height),
            font_size,
            selection_start: None,
            selection_end: None,
            is_selecting: false,
            cursor_position: None,
            context_menu: ContextMenuState::default(),
            pending_actions: Vec::new(),
        }
    }

    /// Attach the terminal session rendered by this window.
    ///
    /// Must happen before any output is processed or spawn issued.
    pub fn attach_session(&mut self, session: Arc<Mutex<Session>>) {
        self.session = Some(session);
    }

    /// Get the attached terminal session
    pub fn session(&self) -> Option<Arc<Mutex<Session>>> {
        self.session.as_ref().map(Arc::clone)
    }

    /// Get pending actions and clear the queue
    pub fn take_pending_actions(&mut self) -> Vec<TerminalAction> {
        std::mem::take(&mut self.pending_actions)
    }

    /// Set callback for PTY resize notifications
    pub fn set_resize_callback<F>(&mut self, callback: F)
    where
        F: Fn(u16, u16) + Send + Sync + 'static,
    {
        self.resize_callback = Some(Box::new(callback));
    }

    /// Trigger resize based on current window size (call after setting resize_callback)
    pub fn sync_size(&mut self) {
        if let Some(ref window) = self.window {
            let size = window.inner_size();
            self.handle_resize(size.width, size.height);
        }
    }

    /// Set the sender for shell input
    pub fn set_input_sender(&mut self, tx: InputSender) {
        self.pty_input_tx = Some(tx);
    }

    pub fn window_id(&self) -> Option<WindowId> {
        self.window_id
    }

    pub fn is_our_window(&self, id: WindowId) -> bool {
        self.window_id == Some(id)
    }

    /// Send input bytes to the shell PTY
    fn send_to_pty(&self, data: &[u8]) {
        if let Some(ref tx) = self.pty_input_tx {
            let _ = tx.send(data.to_vec());
        }
    }

    /// Process output bytes from the shell PTY
    pub fn process_output(&self, data: &[u8]) {
        if let Some(ref session) = self.session {
            session.lock().advance_bytes(data);
        }
    }

    /// Scroll the view (positive = scroll up into history, negative = scroll down)
    pub fn scroll_view(&self, delta: i32) {
        if let Some(ref session) = self.session {
            let session = session.lock();
            let max_offset = session.with_terminal(|term| {
                let screen = term.screen();
                screen.scrollback_rows().saturating_sub(screen.physical_rows) as i32
            });
            drop(session);

            let current = self.scroll_offset.load(Ordering::Relaxed);
            let new_offset = (current + delta).clamp(0, max_offset);
            self.scroll_offset.store(new_offset, Ordering::Relaxed);
        }
    }

    /// Reset scroll to bottom (viewing current content)
    pub fn scroll_to_bottom(&self) {
        self.scroll_offset.store(0, Ordering::Relaxed);
    }

    /// Clear current text selection
    pub fn clear_selection(&mut self) {
        self.selection_start = None;
        self.selection_end = None;
        self.is_selecting = false;
    }

    /// Check if there is an active selection with actual content
    pub fn has_selection(&self) -> bool {
        match (self.selection_start, self.selection_end) {
            (Some(start), Some(end)) => start != end,
            _ => false,
        }
    }

    /// Select all text in the terminal
    pub fn select_all(&mut self) {
        if let Some(ref session) = self.session {
            let session = session.lock();
            let (first_row, last_row, cols) = session.with_terminal(|term| {
                let screen = term.screen();
                let scrollback = screen.scrollback_rows() as i64;
                let physical = screen.physical_rows as i64;
                let first_row = -scrollback;
                let last_row = physical - 1;
                let cols = screen.physical_cols;
                (first_row, last_row, cols)
            });
            drop(session);

            self.selection_start = Some((first_row, 0));
            self.selection_end = Some((last_row, cols));
        }
    }

    /// Get selected text from terminal
    pub fn get_selection_text(&self) -> Option<String> {
        let (start, end) = match (self.selection_start, self.selection_end) {
            (Some(s), Some(e)) => (s, e),
            _ => return None,
        };

        // Normalize selection (start should be before end)
        let (start, end) = if start.0 < end.0 || (start.0 == end.0 && start.1 <= end.1) {
            (start, end)
        } else {
            (end, start)
        };

        let session = self.session.as_ref()?;
        let session = session.lock();
        let text = session.with_terminal_mut(|term| {
            let screen = term.screen_mut();
            let mut result = String::new();
            let total_lines = screen.scrollback_rows();
            let cols = screen.physical_cols;

            for phys_idx in start.0..=end.0 {
                if phys_idx < 0 || phys_idx as usize >= total_lines {
                    continue;
                }
                let start_col = if phys_idx == start.0 { start.1 } else { 0 };
                let end_col = if phys_idx == end.0 { end.1 } else { cols };

                let line = screen.line_mut(phys_idx as usize);
                for cell in line.visible_cells() {
                    let col = cell.cell_index();
                    if col >= start_col && col < end_col {
                        result.push_str(cell.str());
                    }
                }

                if phys_idx < end.0 {
                    let trimmed = result.trim_end_matches(' ');
                    result.truncate(trimmed.len());
                    result.push('\n');
                }
            }

            result.trim_end().to_string()
        });
        drop(session);

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Copy the current selection to the system clipboard
    pub fn copy_selection(&mut self) {
        if let Some(text) = self.get_selection_text() {
            match Clipboard::new() {
                Ok(mut clipboard) => {
                    if let Err(e) = clipboard.set_text(&text) {
                        error!("Failed to write clipboard: {}", e);
                    }
                }
                Err(e) => error!("Failed to open clipboard: {}", e),
            }
            self.clear_selection();
        }
    }

    /// Paste system clipboard text into the terminal
    pub fn paste_clipboard(&self) {
        if let Ok(mut clipboard) = Clipboard::new() {
            if let Ok(text) = clipboard.get_text() {
                self.send_to_pty(text.as_bytes());
            }
        }
    }

    /// Convert screen position (in logical pixels) to terminal cell coordinates
    fn screen_to_terminal_coords(&self, x: f64, y: f64) -> (i64, usize) {
        let char_width = self.cached_char_width.get();
        let line_height = self.cached_line_height.get();

        let x = (x - PADDING as f64).max(0.0);
        let y = (y - PADDING as f64).max(0.0);

        let col = (x / char_width as f64) as usize;
        let visible_row = (y / line_height as f64) as usize;

        let scroll_offset = self.scroll_offset.load(Ordering::Relaxed) as usize;

        if let Some(ref session) = self.session {
            let session = session.lock();
            let phys_row = session.with_terminal(|term| {
                let screen = term.screen();
                let total_lines = screen.scrollback_rows();
                let physical_rows = screen.physical_rows;
                let visible_start = total_lines.saturating_sub(physical_rows + scroll_offset);
                (visible_start + visible_row) as i64
            });
            drop(session);
            (phys_row, col)
        } else {
            (0, col)
        }
    }

    /// Handle primary button press for selection
    fn handle_mouse_press(&mut self, x: f64, y: f64) {
        let (row, col) = self.screen_to_terminal_coords(x, y);
        self.selection_start = Some((row, col));
        self.selection_end = Some((row, col));
        self.is_selecting = true;
    }

    fn handle_mouse_release(&mut self) {
        self.is_selecting = false;
    }

    fn handle_mouse_move(&mut self, x: f64, y: f64) {
        self.cursor_position = Some((x, y));

        if self.is_selecting {
            let (row, col) = self.screen_to_terminal_coords(x, y);
            self.selection_end = Some((row, col));
        }
    }

    /// Open the context menu at the specified position
    fn open_context_menu(&mut self, x: f32, y: f32) {
        self.context_menu.position = egui::Pos2::new(x, y);
        self.context_menu.is_open = true;
        self.context_menu.opened_time = 0.0;
    }

    /// Close the context menu
    fn close_context_menu(&mut self) {
        self.context_menu.is_open = false;
        self.context_menu.opened_time = 0.0;
    }

    /// Create the window (call from resumed handler)
    pub fn create_window(&mut self, event_loop: &ActiveEventLoop, config: &WindowConfig) {
        if self.window.is_some() {
            return;
        }

        info!("Creating terminal window");

        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(LogicalSize::new(config.width, config.height));

        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(8)
            .with_transparency(false);

        let display_builder = DisplayBuilder::new().with_window_attributes(Some(window_attrs));

        let (window, gl_config) = match display_builder.build(event_loop, template, |configs| {
            configs
                .reduce(|accum, config| {
                    if config.num_samples() > accum.num_samples() {
                        config
                    } else {
                        accum
                    }
                })
                .unwrap()
        }) {
            Ok((Some(window), config)) => (window, config),
            Ok((None, _)) => {
                error!("Failed to create window");
                return;
            }
            Err(e) => {
                error!("Failed to create window: {}", e);
                return;
            }
        };

        let window = Arc::new(window);
        self.window_id = Some(window.id());

        let context_attrs =
            ContextAttributesBuilder::new().build(window.window_handle().ok().map(|h| h.as_raw()));

        let gl_display = gl_config.display();

        let gl_context = unsafe {
            gl_display
                .create_context(&gl_config, &context_attrs)
                .expect("Failed to create OpenGL context")
        };

        let size = window.inner_size();
        let surface_attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            window.window_handle().unwrap().as_raw(),
            NonZeroU32::new(size.width.max(1)).unwrap(),
            NonZeroU32::new(size.height.max(1)).unwrap(),
        );

        let gl_surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &surface_attrs)
                .expect("Failed to create OpenGL surface")
        };

        let gl_context = gl_context
            .make_current(&gl_surface)
            .expect("Failed to make context current");

        let glow_context = unsafe {
            glow::Context::from_loader_function_cstr(|s| gl_display.get_proc_address(s) as *const _)
        };
        let glow_context = Arc::new(glow_context);

        let egui_glow = EguiGlow::new(event_loop, glow_context.clone(), None, None, false);

        self.window = Some(window);
        self.gl_context = Some(gl_context);
        self.gl_surface = Some(gl_surface);
        self.glow_context = Some(glow_context);
        self.egui_glow = Some(egui_glow);

        if let Some(ref window) = self.window {
            let initial_size = window.inner_size();
            self.handle_resize(initial_size.width, initial_size.height);
        }

        info!("Terminal window created");
    }

    /// Destroy OpenGL resources (call from exiting handler)
    pub fn destroy(&mut self) {
        if let Some(ref mut egui_glow) = self.egui_glow {
            egui_glow.destroy();
        }
        self.egui_glow = None;
        self.gl_surface = None;
        self.gl_context = None;
        self.glow_context = None;
        self.window = None;
    }

    /// Handle window event - returns true if event was consumed
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        if let Some(ref mut egui_glow) = self.egui_glow {
            let response = egui_glow.on_window_event(self.window.as_ref().unwrap(), event);
            if response.repaint {
                if let Some(ref window) = self.window {
                    window.request_redraw();
                }
            }
        }

        match event {
            WindowEvent::ModifiersChanged(new_modifiers) => {
                self.modifiers = new_modifiers.clone();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if self.context_menu.is_open {
                        if let Key::Named(NamedKey::Escape) = &event.logical_key {
                            self.close_context_menu();
                            return true;
                        }
                    }
                    if self.session.is_some() {
                        self.handle_key_input(event);
                        return true;
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y as i32 * 3,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / 20.0) as i32,
                };
                if lines != 0 {
                    self.scroll_view(lines);
                    if let Some(ref window) = self.window {
                        window.request_redraw();
                    }
                }
                return true;
            }
            WindowEvent::MouseInput { state, button, .. } => {
                match button {
                    MouseButton::Left => {
                        if *state == ElementState::Pressed {
                            // Clicks on the open menu belong to the menu
                            if !self.context_menu.is_open {
                                if let Some((x, y)) = self.cursor_position {
                                    self.handle_mouse_press(x, y);
                                }
                            }
                            if let Some(ref window) = self.window {
                                window.request_redraw();
                            }
                        } else {
                            self.handle_mouse_release();
                        }
                        return true;
                    }
                    MouseButton::Right => {
                        // Secondary button opens the context menu at the pointer
                        if *state == ElementState::Pressed {
                            if let Some((x, y)) = self.cursor_position {
                                self.open_context_menu(x as f32, y as f32);
                                if let Some(ref window) = self.window {
                                    window.request_redraw();
                                }
                            }
                            return true;
                        }
                    }
                    // Other buttons are not ours to consume
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let scale_factor = self.window.as_ref().map(|w| w.scale_factor()).unwrap_or(1.0);
                let logical_x = position.x / scale_factor;
                let logical_y = position.y / scale_factor;
                self.handle_mouse_move(logical_x, logical_y);
                if self.is_selecting {
                    if let Some(ref window) = self.window {
                        window.request_redraw();
                    }
                }
            }
            _ => {}
        }

        false
    }

    fn encode_modifiers(&self) -> Option<u8> {
        let state = self.modifiers.state();
        let mut code = 0u8;
        if state.shift_key() {
            code |= 1;
        }
        if state.alt_key() {
            code |= 2;
        }
        if state.control_key() {
            code |= 4;
        }
        if code == 0 {
            None
        } else {
            Some(code + 1)
        }
    }

    fn build_arrow_seq(&self, key_char: u8) -> Vec<u8> {
        match self.encode_modifiers() {
            Some(m) => vec![0x1b, b'[', b'1', b';', b'0' + m, key_char],
            None => vec![0x1b, b'[', key_char],
        }
    }

    fn build_home_end_seq(&self, key_char: u8) -> Vec<u8> {
        match self.encode_modifiers() {
            Some(m) => vec![0x1b, b'[', b'1', b';', b'0' + m, key_char],
            None => vec![0x1b, b'[', key_char],
        }
    }

    fn build_tilde_seq(&self, code: &[u8]) -> Vec<u8> {
        match self.encode_modifiers() {
            Some(m) => {
                let mut seq = vec![0x1b, b'['];
                seq.extend_from_slice(code);
                seq.push(b';');
                seq.push(b'0' + m);
                seq.push(b'~');
                seq
            }
            None => {
                let mut seq = vec![0x1b, b'['];
                seq.extend_from_slice(code);
                seq.push(b'~');
                seq
            }
        }
    }

    fn build_f1_f4_seq(&self, key_char: u8) -> Vec<u8> {
        match self.encode_modifiers() {
            Some(m) => vec![0x1b, b'[', b'1', b';', b'0' + m, key_char],
            None => vec![0x1b, b'O', key_char],
        }
    }

    fn handle_key_input(&mut self, event: &winit::event::KeyEvent) {
        self.scroll_to_bottom();

        let state = self.modifiers.state();
        let ctrl = state.control_key();
        let alt = state.alt_key();
        let shift = state.shift_key();
        let super_key = state.super_key();

        if super_key && !ctrl && !alt {
            if let Key::Character(c) = &event.logical_key {
                match c.as_str() {
                    "v" | "V" => {
                        self.paste_clipboard();
                        return;
                    }
                    "c" | "C" => {
                        self.copy_selection();
                        return;
                    }
                    "a" | "A" => {
                        self.select_all();
                        return;
                    }
                    _ => {}
                }
            }
        }

        let bytes: Option<Vec<u8>> = match &event.logical_key {
            Key::Named(named) => match named {
                NamedKey::Enter => {
                    if shift {
                        Some(vec![b'\n'])
                    } else if alt {
                        Some(vec![0x1b, b'\r'])
                    } else {
                        Some(vec![b'\r'])
                    }
                }
                NamedKey::Backspace => {
                    if alt {
                        Some(vec![0x1b, 0x7f])
                    } else if ctrl {
                        Some(vec![0x17])
                    } else {
                        Some(vec![0x7f])
                    }
                }
                NamedKey::Tab => {
                    if shift {
                        Some(vec![0x1b, b'[', b'Z'])
                    } else {
                        Some(vec![b'\t'])
                    }
                }
                NamedKey::Escape => Some(vec![0x1b]),
                NamedKey::ArrowUp => Some(self.build_arrow_seq(b'A')),
                NamedKey::ArrowDown => Some(self.build_arrow_seq(b'B')),
                NamedKey::ArrowRight => Some(self.build_arrow_seq(b'C')),
                NamedKey::ArrowLeft => Some(self.build_arrow_seq(b'D')),
                NamedKey::Home => Some(self.build_home_end_seq(b'H')),
                NamedKey::End => Some(self.build_home_end_seq(b'F')),
                NamedKey::PageUp => Some(self.build_tilde_seq(b"5")),
                NamedKey::PageDown => Some(self.build_tilde_seq(b"6")),
                NamedKey::Delete => Some(self.build_tilde_seq(b"3")),
                NamedKey::Insert => Some(self.build_tilde_seq(b"2")),
                NamedKey::Space => {
                    if ctrl {
                        Some(vec![0x00])
                    } else if alt {
                        Some(vec![0x1b, b' '])
                    } else {
                        Some(vec![b' '])
                    }
                }
                NamedKey::F1 => Some(self.build_f1_f4_seq(b'P')),
                NamedKey::F2 => Some(self.build_f1_f4_seq(b'Q')),
                NamedKey::F3 => Some(self.build_f1_f4_seq(b'R')),
                NamedKey::F4 => Some(self.build_f1_f4_seq(b'S')),
                NamedKey::F5 => Some(self.build_tilde_seq(b"15")),
                NamedKey::F6 => Some(self.build_tilde_seq(b"17")),
                NamedKey::F7 => Some(self.build_tilde_seq(b"18")),
                NamedKey::F8 => Some(self.build_tilde_seq(b"19")),
                NamedKey::F9 => Some(self.build_tilde_seq(b"20")),
                NamedKey::F10 => Some(self.build_tilde_seq(b"21")),
                NamedKey::F11 => Some(self.build_tilde_seq(b"23")),
                NamedKey::F12 => Some(self.build_tilde_seq(b"24")),
                _ => None,
            },
            Key::Character(c) => {
                let s = c.as_str();
                if ctrl && s.len() == 1 {
                    let ch = s.chars().next().unwrap();
                    match ch.to_ascii_lowercase() {
                        'a'..='z' => {
                            let ctrl_char = (ch.to_ascii_lowercase() as u8) - b'a' + 1;
                            if alt {
                                Some(vec![0x1b, ctrl_char])
                            } else {
                                Some(vec![ctrl_char])
                            }
                        }
                        '[' => Some(vec![0x1b]),
                        '\\' => Some(vec![0x1c]),
                        ']' => Some(vec![0x1d]),
                        '^' | '6' => Some(vec![0x1e]),
                        '_' | '-' => Some(vec![0x1f]),
                        '@' | '2' => Some(vec![0x00]),
                        _ => Some(s.as_bytes().to_vec()),
                    }
                } else if alt && !ctrl && !s.is_empty() {
                    let mut bytes = vec![0x1b];
                    bytes.extend_from_slice(s.as_bytes());
                    Some(bytes)
                } else if s.len() == 1 {
                    let ch = s.chars().next().unwrap();
                    if (ch as u32) < 0x20 {
                        Some(vec![ch as u8])
                    } else {
                        Some(s.as_bytes().to_vec())
                    }
                } else {
                    Some(s.as_bytes().to_vec())
                }
            }
            _ => None,
        };

        // Fallback for layouts where ctrl combinations don't surface as characters
        let bytes = bytes.or_else(|| {
            if let PhysicalKey::Code(key_code) = event.physical_key {
                if !ctrl {
                    return None;
                }
                let base = match key_code {
                    KeyCode::KeyA => Some(0x01),
                    KeyCode::KeyB => Some(0x02),
                    KeyCode::KeyC => Some(0x03),
                    KeyCode::KeyD => Some(0x04),
                    KeyCode::KeyE => Some(0x05),
                    KeyCode::KeyF => Some(0x06),
                    KeyCode::KeyG => Some(0x07),
                    KeyCode::KeyH => Some(0x08),
                    KeyCode::KeyI => Some(0x09),
                    KeyCode::KeyJ => Some(0x0a),
                    KeyCode::KeyK => Some(0x0b),
                    KeyCode::KeyL => Some(0x0c),
                    KeyCode::KeyM => Some(0x0d),
                    KeyCode::KeyN => Some(0x0e),
                    KeyCode::KeyO => Some(0x0f),
                    KeyCode::KeyP => Some(0x10),
                    KeyCode::KeyQ => Some(0x11),
                    KeyCode::KeyR => Some(0x12),
                    KeyCode::KeyS => Some(0x13),
                    KeyCode::KeyT => Some(0x14),
                    KeyCode::KeyU => Some(0x15),
                    KeyCode::KeyV => Some(0x16),
                    KeyCode::KeyW => Some(0x17),
                    KeyCode::KeyX => Some(0x18),
                    KeyCode::KeyY => Some(0x19),
                    KeyCode::KeyZ => Some(0x1a),
                    _ => None,
                };
                base.map(|b| if alt { vec![0x1b, b] } else { vec![b] })
            } else {
                None
            }
        });

        if let Some(ref data) = bytes {
            debug!("Sending to PTY: {:?}", data);
            self.clear_selection();
            self.send_to_pty(data);
        }
    }

    pub fn handle_resize(&mut self, physical_width: u32, physical_height: u32) {
        if let (Some(ref gl_context), Some(ref gl_surface)) = (&self.gl_context, &self.gl_surface) {
            gl_surface.resize(
                gl_context,
                NonZeroU32::new(physical_width.max(1)).unwrap(),
                NonZeroU32::new(physical_height.max(1)).unwrap(),
            );
        }

        let scale_factor = self.window.as_ref().map(|w| w.scale_factor()).unwrap_or(1.0);
        let width = (physical_width as f64 / scale_factor) as f32;
        let height = (physical_height as f64 / scale_factor) as f32;

        let char_width = self.cached_char_width.get();
        let line_height = self.cached_line_height.get();
        let inner_margin = PADDING * 2.0;

        let cols = ((width - inner_margin) / char_width).max(10.0) as u16;
        let rows = ((height - inner_margin) / line_height).max(5.0) as u16;

        debug!("Window resize: {:.0}x{:.0} logical -> {}cols x {}rows", width, height, cols, rows);

        if let Some(ref session) = self.session {
            session.lock().resize(cols as usize, rows as usize);
        }

        if let Some(ref callback) = self.resize_callback {
            callback(rows, cols);
        }
    }

    pub fn render(&mut self) {
        let Some(ref window) = self.window else {
            return;
        };
        let Some(ref gl_context) = self.gl_context else {
            return;
        };
        let Some(ref gl_surface) = self.gl_surface else {
            return;
        };
        let Some(ref glow_context) = self.glow_context else {
            return;
        };
        let Some(ref mut egui_glow) = self.egui_glow else {
            return;
        };

        let scroll_offset = self.scroll_offset.load(Ordering::Relaxed) as usize;
        let cached_char_width = &self.cached_char_width;
        let cached_line_height = &self.cached_line_height;
        let font_size = self.font_size;
        let theme = self.theme;

        // Capture selection state for rendering
        let selection = match (self.selection_start, self.selection_end) {
            (Some(start), Some(end)) => {
                let (start, end) = if start.0 < end.0 || (start.0 == end.0 && start.1 <= end.1) {
                    (start, end)
                } else {
                    (end, start)
                };
                Some((start, end))
            }
            _ => None,
        };

        let has_selection = match selection {
            Some((start, end)) => start != end,
            None => false,
        };

        let session = self.session.as_ref().map(Arc::clone);
        let context_menu = &mut self.context_menu;

        // Actions triggered from inside the egui pass
        let mut new_actions = Vec::new();

        egui_glow.run(window, |ctx| {
            egui::CentralPanel::default()
                .frame(
                    egui::Frame::default()
                        .fill(theme.background())
                        .inner_margin(PADDING),
                )
                .show(ctx, |ui| {
                    let Some(ref session) = session else {
                        return;
                    };

                    ui.spacing_mut().item_spacing = egui::vec2(0.0, 0.0);
                    ui.style_mut().spacing.interact_size = egui::vec2(0.0, 0.0);

                    let sess = session.lock();
                    let palette = sess.palette().clone();

                    sess.with_terminal_mut(|term| {
                        let cursor = term.cursor_pos();
                        let screen = term.screen_mut();
                        let physical_rows = screen.physical_rows;

                        let content_min = ui.cursor().min;

                        let font_id = egui::FontId::monospace(font_size);
                        let (char_width, line_height) = (
                            ctx.fonts(|f| f.glyph_width(&font_id, 'M')),
                            ctx.fonts(|f| f.row_height(&font_id)),
                        );

                        cached_char_width.set(char_width);
                        cached_line_height.set(line_height);

                        let total_lines = screen.scrollback_rows();
                        let visible_start =
                            total_lines.saturating_sub(physical_rows + scroll_offset);

                        let painter = ui.painter();
                        let default_bg = theme.background();

                        for row_idx in 0..physical_rows {
                            let phys_idx = visible_start + row_idx;
                            if phys_idx >= total_lines {
                                continue;
                            }

                            let line = screen.line_mut(phys_idx);
                            let current_row = phys_idx as i64;

                            for cell in line.visible_cells() {
                                let col_idx = cell.cell_index();
                                let attrs = cell.attrs();
                                let mut fg =
                                    color_attr_to_egui(attrs.foreground(), &palette, true);
                                let bg_attr = attrs.background();
                                let mut bg = if bg_attr == ColorAttribute::Default {
                                    None
                                } else {
                                    Some(color_attr_to_egui(bg_attr, &palette, false))
                                };

                                if let Some((sel_start, sel_end)) = selection {
                                    let in_selection = if sel_start.0 == sel_end.0 {
                                        current_row == sel_start.0
                                            && col_idx >= sel_start.1
                                            && col_idx < sel_end.1
                                    } else if current_row == sel_start.0 {
                                        col_idx >= sel_start.1
                                    } else if current_row == sel_end.0 {
                                        col_idx < sel_end.1
                                    } else {
                                        current_row > sel_start.0 && current_row < sel_end.0
                                    };

                                    if in_selection {
                                        fg = egui::Color32::WHITE;
                                        bg = Some(theme.selection_background());
                                    }
                                }

                                use wezterm_cell::Intensity;
                                match attrs.intensity() {
                                    Intensity::Bold => {
                                        fg = egui::Color32::from_rgb(
                                            (fg.r() as u16 * 5 / 4).min(255) as u8,
                                            (fg.g() as u16 * 5 / 4).min(255) as u8,
                                            (fg.b() as u16 * 5 / 4).min(255) as u8,
                                        );
                                    }
                                    Intensity::Half => {
                                        fg = egui::Color32::from_rgb(
                                            fg.r() / 2,
                                            fg.g() / 2,
                                            fg.b() / 2,
                                        );
                                    }
                                    Intensity::Normal => {}
                                }

                                if attrs.reverse() {
                                    let temp_fg = fg;
                                    fg = bg.unwrap_or(default_bg);
                                    bg = Some(temp_fg);
                                }

                                if attrs.invisible() {
                                    fg = bg.unwrap_or(default_bg);
                                }

                                use wezterm_cell::Underline;
                                let has_underline = attrs.underline() != Underline::None;
                                let has_strikethrough = attrs.strikethrough();

                                let text = cell.str();
                                let cell_width = cell.width();

                                let cell_x = content_min.x + col_idx as f32 * char_width;
                                let cell_y = content_min.y + row_idx as f32 * line_height;
                                let total_cell_width = cell_width as f32 * char_width;
                                let cell_rect = egui::Rect::from_min_size(
                                    egui::pos2(cell_x, cell_y),
                                    egui::vec2(total_cell_width, line_height),
                                );

                                if let Some(bg_color) = bg {
                                    painter.rect_filled(cell_rect, 0.0, bg_color);
                                }

                                if !text.is_empty() && text != " " {
                                    painter.text(
                                        egui::pos2(cell_x, cell_y),
                                        egui::Align2::LEFT_TOP,
                                        text,
                                        font_id.clone(),
                                        fg,
                                    );
                                }

                                if has_underline {
                                    let underline_y = cell_y + line_height - 2.0;
                                    painter.line_segment(
                                        [
                                            egui::pos2(cell_x, underline_y),
                                            egui::pos2(cell_x + total_cell_width, underline_y),
                                        ],
                                        egui::Stroke::new(1.0, fg),
                                    );
                                }

                                if has_strikethrough {
                                    let strike_y = cell_y + line_height / 2.0;
                                    painter.line_segment(
                                        [
                                            egui::pos2(cell_x, strike_y),
                                            egui::pos2(cell_x + total_cell_width, strike_y),
                                        ],
                                        egui::Stroke::new(1.0, fg),
                                    );
                                }
                            }
                        }

                        use wezterm_surface::CursorVisibility;
                        let cursor_in_bounds =
                            cursor.y >= 0 && (cursor.y as usize) < physical_rows;
                        let cursor_visible = cursor.visibility == CursorVisibility::Visible;
                        let should_draw_cursor =
                            scroll_offset == 0 && cursor_in_bounds && cursor_visible;

                        if should_draw_cursor {
                            let cursor_pixel_x = content_min.x + cursor.x as f32 * char_width;
                            let cursor_pixel_y =
                                content_min.y + cursor.y as f32 * line_height;

                            let cursor_rect = match cursor.shape {
                                CursorShape::BlinkingBlock | CursorShape::SteadyBlock => {
                                    egui::Rect::from_min_size(
                                        egui::pos2(cursor_pixel_x, cursor_pixel_y),
                                        egui::vec2(char_width, line_height),
                                    )
                                }
                                CursorShape::BlinkingUnderline
                                | CursorShape::SteadyUnderline => egui::Rect::from_min_size(
                                    egui::pos2(
                                        cursor_pixel_x,
                                        cursor_pixel_y + line_height - 2.0,
                                    ),
                                    egui::vec2(char_width, 2.0),
                                ),
                                CursorShape::BlinkingBar | CursorShape::SteadyBar => {
                                    egui::Rect::from_min_size(
                                        egui::pos2(cursor_pixel_x, cursor_pixel_y),
                                        egui::vec2(2.0, line_height),
                                    )
                                }
                                _ => egui::Rect::from_min_size(
                                    egui::pos2(cursor_pixel_x, cursor_pixel_y),
                                    egui::vec2(char_width, line_height),
                                ),
                            };

                            painter.rect_filled(cursor_rect, 0.0, theme.cursor());
                        }
                    });
                });

            // Right-click context menu
            if context_menu.is_open {
                let actions = render_context_menu(ctx, context_menu, theme, has_selection);
                new_actions.extend(actions);
            }

            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        });

        // Store pending actions for the main app
        self.pending_actions.extend(new_actions);

        {
            use glow::HasContext as _;
            unsafe {
                glow_context.clear_color(0.1, 0.1, 0.1, 1.0);
                glow_context.clear(glow::COLOR_BUFFER_BIT);
            }
        }

        egui_glow.paint(window);
        gl_surface.swap_buffers(gl_context).unwrap();
    }
}

impl Default for TerminalWindowState {
    fn default() -> Self {
        Self::new(11.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_session() -> TerminalWindowState {
        let mut state = TerminalWindowState::new(11.0);
        state.attach_session(Arc::new(Mutex::new(Session::new(80, 24, 1000))));
        state
    }

    #[test]
    fn test_no_selection_by_default() {
        let state = TerminalWindowState::default();
        assert!(!state.has_selection());
        assert!(state.get_selection_text().is_none());
    }

    #[test]
    fn test_selection_text_extraction() {
        let mut state = state_with_session();
        state
            .session()
            .unwrap()
            .lock()
            .advance_bytes(b"first line\r\nsecond line\r\n");

        state.selection_start = Some((0, 0));
        state.selection_end = Some((0, 5));
        assert!(state.has_selection());
        assert_eq!(state.get_selection_text().as_deref(), Some("first"));
    }

    #[test]
    fn test_selection_normalizes_reversed_range() {
        let mut state = state_with_session();
        state
            .session()
            .unwrap()
            .lock()
            .advance_bytes(b"first line\r\nsecond line\r\n");

        // Dragged right-to-left
        state.selection_start = Some((0, 5));
        state.selection_end = Some((0, 0));
        assert_eq!(state.get_selection_text().as_deref(), Some("first"));
    }

    #[test]
    fn test_multiline_selection_joins_with_newline() {
        let mut state = state_with_session();
        state
            .session()
            .unwrap()
            .lock()
            .advance_bytes(b"aaa\r\nbbb\r\n");

        state.selection_start = Some((0, 0));
        state.selection_end = Some((1, 3));
        assert_eq!(state.get_selection_text().as_deref(), Some("aaa\nbbb"));
    }

    #[test]
    fn test_select_all_covers_grid() {
        let mut state = state_with_session();
        state
            .session()
            .unwrap()
            .lock()
            .advance_bytes(b"hello\r\n");
        state.select_all();
        assert!(state.has_selection());
        let text = state.get_selection_text().unwrap();
        assert!(text.contains("hello"));
    }

    #[test]
    fn test_clear_selection() {
        let mut state = state_with_session();
        state.selection_start = Some((0, 0));
        state.selection_end = Some((0, 3));
        state.clear_selection();
        assert!(!state.has_selection());
    }

    #[test]
    fn test_arrow_sequences_without_modifiers() {
        let state = TerminalWindowState::default();
        assert_eq!(state.build_arrow_seq(b'A'), vec![0x1b, b'[', b'A']);
        assert_eq!(state.build_f1_f4_seq(b'P'), vec![0x1b, b'O', b'P']);
        assert_eq!(state.build_tilde_seq(b"5"), vec![0x1b, b'[', b'5', b'~']);
    }

    #[test]
    fn test_context_menu_opens_at_position() {
        let mut state = TerminalWindowState::default();
        state.open_context_menu(120.0, 45.0);
        assert!(state.context_menu.is_open);
        assert_eq!(state.context_menu.position, egui::pos2(120.0, 45.0));

        state.close_context_menu();
        assert!(!state.context_menu.is_open);
        assert_eq!(state.context_menu.opened_time, 0.0);
    }

    #[test]
    fn test_pending_actions_drained_once() {
        let mut state = TerminalWindowState::default();
        state.pending_actions.push(TerminalAction::Copy);
        state.pending_actions.push(TerminalAction::Paste);

        let actions = state.take_pending_actions();
        assert_eq!(actions, vec![TerminalAction::Copy, TerminalAction::Paste]);
        assert!(state.take_pending_actions().is_empty());
    }

    #[test]
    fn test_input_forwarded_to_channel() {
        let mut state = state_with_session();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.set_input_sender(tx);

        state.send_to_pty(b"ls\r");
        assert_eq!(rx.try_recv().unwrap(), b"ls\r".to_vec());
    }

    #[test]
    fn test_scroll_clamped_to_history() {
        let state = state_with_session();
        // No scrollback yet, so scrolling up stays at the bottom
        state.scroll_view(10);
        assert_eq!(state.scroll_offset.load(Ordering::Relaxed), 0);
    }
}
