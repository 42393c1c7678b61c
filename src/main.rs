// Hide console window on Windows release builds
#![cfg_attr(
    all(target_os = "windows", not(debug_assertions)),
    windows_subsystem = "windows"
)]

//! LumTerm - Entry Point
//!
//! Creates the terminal window, spawns the shell behind a PTY, and runs the
//! winit event loop.

use anyhow::Result;
use lumterm::{
    core::{
        config::Config,
        events::{AppEvent, EventSender},
    },
    pty::ShellPty,
    terminal::Session,
    window::{TerminalAction, TerminalWindowState},
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::WindowId,
};

/// Main application handler for winit event loop
struct App {
    /// Event sender for inter-module communication (wakes event loop)
    event_tx: EventSender,
    /// Event receiver for inter-module communication
    event_rx: Option<mpsc::UnboundedReceiver<AppEvent>>,
    /// Terminal window state
    terminal_window: TerminalWindowState,
    /// Shell PTY
    shell: Option<Arc<ShellPty>>,
    /// Thread draining the input channel into the PTY
    _input_thread: Option<std::thread::JoinHandle<()>>,
    /// Configuration
    config: Config,
    /// Whether the shell has been started (spawn is issued exactly once)
    shell_started: bool,
}

impl App {
    fn new(
        event_tx: EventSender,
        event_rx: mpsc::UnboundedReceiver<AppEvent>,
        config: Config,
    ) -> Self {
        let font_size = config.terminal.font_size;
        Self {
            event_tx,
            event_rx: Some(event_rx),
            terminal_window: TerminalWindowState::new(font_size),
            shell: None,
            _input_thread: None,
            config,
            shell_started: false,
        }
    }

    /// Start the shell in a PTY sized to the current grid.
    ///
    /// The session must be attached to the window before this is called.
    fn start_shell(&mut self) {
        if self.shell_started {
            return;
        }
        self.shell_started = true;

        // Channel for shell input
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        self.terminal_window.set_input_sender(input_tx);

        let shell = Arc::new(ShellPty::new(
            self.config.shell.clone(),
            self.event_tx.clone(),
        ));

        let (rows, cols) = match self.terminal_window.session() {
            Some(session) => {
                let session = session.lock();
                (session.physical_rows() as u16, session.physical_cols() as u16)
            }
            None => (24, 80),
        };

        if let Err(e) = shell.start(rows, cols) {
            // Surface the failure in the window instead of leaving it blank
            error!("Failed to start shell: {}", e);
            self.terminal_window
                .process_output(format!("lumterm: {}\r\n", e).as_bytes());
            if let Some(ref window) = self.terminal_window.window {
                window.request_redraw();
            }
            return;
        }

        // Drain the input channel into the PTY
        let input_shell = Arc::clone(&shell);
        self._input_thread = Some(std::thread::spawn(move || {
            while let Some(data) = input_rx.blocking_recv() {
                if let Err(e) = input_shell.send_input(&data) {
                    warn!("Failed to send input to shell: {}", e);
                    break;
                }
            }
        }));

        // Keep the PTY grid in sync with the window
        let resize_shell = Arc::clone(&shell);
        self.terminal_window.set_resize_callback(move |rows, cols| {
            if let Err(e) = resize_shell.resize(rows, cols) {
                warn!("Failed to resize PTY: {}", e);
            }
        });
        self.terminal_window.sync_size();

        self.shell = Some(shell);
    }

    /// Handle an application event from the channel
    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::PtyOutput(data) => {
                self.terminal_window.process_output(&data);
            }
            AppEvent::PtyExited(code) => {
                info!("Shell exited with code {:?}", code);
                let notice = match code {
                    Some(code) => format!("\r\n[process exited with code {}]\r\n", code),
                    None => "\r\n[process exited]\r\n".to_string(),
                };
                self.terminal_window.process_output(notice.as_bytes());
            }
        }
    }

    /// Handle an action triggered from the terminal UI
    fn handle_terminal_action(&mut self, action: TerminalAction) {
        match action {
            TerminalAction::Copy => self.terminal_window.copy_selection(),
            TerminalAction::Paste => self.terminal_window.paste_clipboard(),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        if self.terminal_window.session().is_none() {
            // The session exists before any styling or spawn call is issued
            let session = Arc::new(Mutex::new(Session::new(
                80,
                24,
                self.config.terminal.scrollback_lines,
            )));
            self.terminal_window.attach_session(session);
        }

        self.terminal_window
            .create_window(event_loop, &self.config.window);
        self.start_shell();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if !self.terminal_window.is_our_window(window_id) {
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                info!("Window closed, exiting");
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(size) => {
                self.terminal_window.handle_resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                self.terminal_window.render();

                // Process any terminal actions triggered during rendering
                let actions = self.terminal_window.take_pending_actions();
                for action in actions {
                    self.handle_terminal_action(action);
                }
                return;
            }
            _ => {}
        }
        self.terminal_window.handle_window_event(&event);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        let mut needs_redraw = false;

        // Collect events first, then process them
        let events: Vec<AppEvent> = if let Some(ref mut rx) = self.event_rx {
            let mut events = Vec::new();
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
            events
        } else {
            Vec::new()
        };

        if !events.is_empty() {
            needs_redraw = true;
        }
        for event in events {
            self.handle_event(event);
        }

        // Process any pending terminal actions
        let actions = self.terminal_window.take_pending_actions();
        if !actions.is_empty() {
            needs_redraw = true;
        }
        for action in actions {
            self.handle_terminal_action(action);
        }

        if needs_redraw {
            if let Some(ref window) = self.terminal_window.window {
                window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        info!("Application exiting");

        // Destroy OpenGL resources properly to avoid "Resources will leak!" warning
        self.terminal_window.destroy();

        if let Some(ref shell) = self.shell {
            if shell.is_running() {
                if let Err(e) = shell.stop() {
                    warn!("Failed to stop shell: {}", e);
                }
            }
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting LumTerm");

    // Load configuration
    let config = Config::load()?;

    // Create event channel
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    // Create event loop
    let event_loop = EventLoop::new()?;

    // Create EventSender that wraps the channel + event loop proxy for wake-up
    let proxy = event_loop.create_proxy();
    let event_sender = EventSender::new(event_tx, proxy);

    // Create application
    let mut app = App::new(event_sender, event_rx, config);

    // Run event loop
    event_loop.run_app(&mut app)?;

    Ok(())
}
