//! Shell PTY integration tests
//!
//! Spawns a real shell behind a PTY and checks that output flows through the
//! event channel into the terminal grid.

#![cfg(unix)]

use lumterm::core::config::ShellConfig;
use lumterm::core::events::{AppEvent, EventSender};
use lumterm::pty::{ShellPty, SpawnError};
use lumterm::terminal::Session;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const DEADLINE: Duration = Duration::from_secs(10);

/// Drain events until the predicate matches or the deadline passes.
fn wait_for<F>(rx: &mut mpsc::UnboundedReceiver<AppEvent>, session: &Session, mut pred: F) -> bool
where
    F: FnMut(&AppEvent) -> bool,
{
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        match rx.try_recv() {
            Ok(event) => {
                if let AppEvent::PtyOutput(ref data) = event {
                    session.advance_bytes(data);
                }
                if pred(&event) {
                    return true;
                }
            }
            Err(_) => std::thread::sleep(Duration::from_millis(20)),
        }
    }
    false
}

/// Collect all visible grid text, scrollback included.
fn grid_text(session: &Session) -> String {
    session.with_terminal_mut(|term| {
        let screen = term.screen_mut();
        let total = screen.scrollback_rows();
        let mut out = String::new();
        for idx in 0..total {
            let line = screen.line_mut(idx);
            for cell in line.visible_cells() {
                out.push_str(cell.str());
            }
            out.push('\n');
        }
        out
    })
}

#[test]
fn shell_output_reaches_terminal_grid() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pty = ShellPty::new(
        ShellConfig {
            program: "/bin/sh".to_string(),
            working_directory: "/".to_string(),
        },
        EventSender::detached(tx),
    );

    let session = Session::new(80, 24, 1000);

    pty.start(24, 80).expect("shell should spawn");
    assert!(pty.is_running());

    pty.send_input(b"echo marker-$((40 + 2))\n").unwrap();
    pty.send_input(b"exit\n").unwrap();

    let exited = wait_for(&mut rx, &session, |e| matches!(e, AppEvent::PtyExited(_)));
    assert!(exited, "shell did not exit within the deadline");
    assert!(!pty.is_running());

    let text = grid_text(&session);
    assert!(
        text.contains("marker-42"),
        "expected echoed marker in grid, got:\n{}",
        text
    );
}

#[test]
fn shell_starts_in_configured_directory() {
    let dir = tempfile::tempdir().unwrap();
    let dir_name = dir.path().file_name().unwrap().to_str().unwrap().to_string();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let pty = ShellPty::new(
        ShellConfig {
            program: "/bin/sh".to_string(),
            working_directory: dir.path().display().to_string(),
        },
        EventSender::detached(tx),
    );

    let session = Session::new(80, 24, 1000);

    pty.start(24, 80).expect("shell should spawn");
    pty.send_input(b"pwd\n").unwrap();
    pty.send_input(b"exit\n").unwrap();

    let exited = wait_for(&mut rx, &session, |e| matches!(e, AppEvent::PtyExited(_)));
    assert!(exited, "shell did not exit within the deadline");

    let text = grid_text(&session);
    assert!(
        text.contains(&dir_name),
        "expected cwd {} in pwd output, got:\n{}",
        dir_name,
        text
    );
}

#[test]
fn missing_shell_binary_is_reported() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let pty = ShellPty::new(
        ShellConfig {
            program: "/nonexistent/never-a-shell".to_string(),
            working_directory: "/".to_string(),
        },
        EventSender::detached(tx),
    );

    let err = pty.start(24, 80).expect_err("spawn must fail");
    assert!(matches!(err, SpawnError::Spawn { .. }));
    assert!(!pty.is_running());
    // The message names the binary so the user sees what failed
    assert!(err.to_string().contains("/nonexistent/never-a-shell"));
}
