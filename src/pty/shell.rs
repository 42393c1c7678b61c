//! PTY wrapper for spawning and managing the user's shell

use crate::core::config::ShellConfig;
use crate::core::events::{AppEvent, EventSender};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use portable_pty::{native_pty_system, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Shell used when neither the config nor $SHELL names one
const DEFAULT_SHELL: &str = "/bin/bash";

/// Errors raised when the shell cannot be started.
///
/// These are surfaced to the user instead of leaving an unresponsive window.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("no home directory found for the current user")]
    NoHomeDirectory,
    #[error("failed to open pty: {0}")]
    OpenPty(anyhow::Error),
    #[error("failed to spawn {program}: {error}")]
    Spawn { program: String, error: anyhow::Error },
    #[error("failed to get pty writer: {0}")]
    Writer(anyhow::Error),
}

/// PTY wrapper for the shell process
pub struct ShellPty {
    /// PTY master handle
    master: Arc<Mutex<Option<Box<dyn MasterPty + Send>>>>,
    /// Writer to PTY
    writer: Arc<Mutex<Option<Box<dyn Write + Send>>>>,
    /// Event sender
    event_tx: EventSender,
    /// Configuration
    config: ShellConfig,
    /// Whether the shell process is running
    running: Arc<Mutex<bool>>,
}

impl ShellPty {
    /// Create a new PTY wrapper
    pub fn new(config: ShellConfig, event_tx: EventSender) -> Self {
        Self {
            master: Arc::new(Mutex::new(None)),
            writer: Arc::new(Mutex::new(None)),
            event_tx,
            config,
            running: Arc::new(Mutex::new(false)),
        }
    }

    /// Resolve the shell binary: configured value, then $SHELL, then /bin/bash
    pub fn resolve_program(&self) -> String {
        if !self.config.program.is_empty() {
            return self.config.program.clone();
        }
        match std::env::var("SHELL") {
            Ok(shell) if !shell.is_empty() => shell,
            _ => DEFAULT_SHELL.to_string(),
        }
    }

    /// Resolve the working directory: configured value, then the home directory
    pub fn resolve_working_directory(&self) -> Result<PathBuf, SpawnError> {
        if !self.config.working_directory.is_empty() {
            return Ok(PathBuf::from(&self.config.working_directory));
        }
        dirs::home_dir().ok_or(SpawnError::NoHomeDirectory)
    }

    /// Start the shell in a PTY with the given initial grid size.
    ///
    /// Non-blocking: the child runs behind the PTY and its output arrives as
    /// `AppEvent::PtyOutput` on the event channel.
    pub fn start(&self, rows: u16, cols: u16) -> Result<(), SpawnError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(SpawnError::OpenPty)?;

        let program = self.resolve_program();
        let cwd = self.resolve_working_directory()?;

        let mut cmd = CommandBuilder::new(&program);
        cmd.cwd(&cwd);

        // Advertise the capabilities the emulation library implements
        cmd.env("TERM", "xterm-256color");
        cmd.env("COLORTERM", "truecolor");

        info!("Starting shell: {} in {:?}", program, cwd);

        // Spawn the child process
        let child = pair.slave.spawn_command(cmd).map_err(|e| SpawnError::Spawn {
            program: program.clone(),
            error: e,
        })?;

        // Get writer for sending input
        let writer = pair.master.take_writer().map_err(SpawnError::Writer)?;

        // Store handles
        *self.master.lock() = Some(pair.master);
        *self.writer.lock() = Some(writer);
        *self.running.lock() = true;

        // Start reader task
        self.start_reader_task(child);

        Ok(())
    }

    /// Start background task to read PTY output
    fn start_reader_task(&self, mut child: Box<dyn portable_pty::Child + Send + Sync>) {
        let master = Arc::clone(&self.master);
        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);

        std::thread::spawn(move || {
            let mut buffer = [0u8; 4096];

            // Get reader from master
            let reader_result = {
                let master_guard = master.lock();
                master_guard.as_ref().map(|m| m.try_clone_reader())
            };

            let mut reader = match reader_result {
                Some(Ok(r)) => r,
                Some(Err(e)) => {
                    error!("Failed to get PTY reader: {}", e);
                    return;
                }
                None => {
                    error!("No PTY master available");
                    return;
                }
            };

            loop {
                match reader.read(&mut buffer) {
                    Ok(0) => {
                        // EOF - process exited
                        debug!("PTY EOF");
                        break;
                    }
                    Ok(n) => {
                        let _ = event_tx.send(AppEvent::PtyOutput(buffer[..n].to_vec()));
                    }
                    Err(e) => {
                        if e.kind() != std::io::ErrorKind::Interrupted {
                            warn!("PTY read error: {}", e);
                            break;
                        }
                    }
                }
            }

            // Wait for child to exit
            let exit_code: Option<i32> = match child.wait() {
                Ok(status) => {
                    info!("Shell exited with status: {:?}", status);
                    Some(status.exit_code() as i32)
                }
                Err(e) => {
                    error!("Failed to wait for shell: {}", e);
                    None
                }
            };

            *running.lock() = false;

            let _ = event_tx.send(AppEvent::PtyExited(exit_code));
        });
    }

    /// Send input to the PTY
    pub fn send_input(&self, data: &[u8]) -> Result<()> {
        let mut writer_guard = self.writer.lock();
        let writer = writer_guard.as_mut().context("PTY not running")?;

        writer.write_all(data)?;
        writer.flush()?;

        Ok(())
    }

    /// Check if the shell process is running
    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }

    /// Stop the shell by signalling end-of-input
    pub fn stop(&self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        // Ctrl+D signals EOF to the shell
        if let Err(e) = self.send_input(b"\x04") {
            warn!("Failed to send EOF to shell: {}", e);
        }

        // Give it a moment to exit
        std::thread::sleep(std::time::Duration::from_millis(200));

        Ok(())
    }

    /// Resize the PTY
    pub fn resize(&self, rows: u16, cols: u16) -> Result<()> {
        let master_guard = self.master.lock();
        if let Some(ref master) = *master_guard {
            master
                .resize(PtySize {
                    rows,
                    cols,
                    pixel_width: 0,
                    pixel_height: 0,
                })
                .context("Failed to resize PTY")?;
        }
        Ok(())
    }
}

impl Drop for ShellPty {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_pty(config: ShellConfig) -> ShellPty {
        let (tx, _rx) = mpsc::unbounded_channel();
        ShellPty::new(config, EventSender::detached(tx))
    }

    #[test]
    fn test_shell_pty_creation() {
        let pty = test_pty(ShellConfig::default());
        assert!(!pty.is_running());
    }

    #[test]
    fn test_resolve_program_prefers_config() {
        let pty = test_pty(ShellConfig {
            program: "/bin/dash".to_string(),
            working_directory: String::new(),
        });
        assert_eq!(pty.resolve_program(), "/bin/dash");
    }

    #[test]
    fn test_resolve_working_directory_prefers_config() {
        let pty = test_pty(ShellConfig {
            program: String::new(),
            working_directory: "/tmp".to_string(),
        });
        assert_eq!(
            pty.resolve_working_directory().unwrap(),
            PathBuf::from("/tmp")
        );
    }

    #[test]
    fn test_send_input_before_start_fails() {
        let pty = test_pty(ShellConfig::default());
        assert!(pty.send_input(b"echo hi\r").is_err());
    }
}
