//! Application event definitions

use tokio::sync::mpsc;
use winit::event_loop::EventLoopProxy;

/// Wrapper around `mpsc::UnboundedSender<AppEvent>` that also wakes the winit
/// event loop via `EventLoopProxy` after every send.  This allows running the
/// loop with `ControlFlow::Wait` without losing responsiveness to background
/// events (PTY output, shell exit).
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<AppEvent>,
    proxy: Option<EventLoopProxy<()>>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<AppEvent>, proxy: EventLoopProxy<()>) -> Self {
        Self { tx, proxy: Some(proxy) }
    }

    /// Sender with no event loop attached (headless use in tests)
    pub fn detached(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { tx, proxy: None }
    }

    pub fn send(&self, event: AppEvent) -> Result<(), mpsc::error::SendError<AppEvent>> {
        let result = self.tx.send(event);
        if let Some(ref proxy) = self.proxy {
            let _ = proxy.send_event(());
        }
        result
    }
}

/// Application-wide events for inter-module communication
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// PTY output received (raw bytes)
    PtyOutput(Vec<u8>),

    /// Shell process exited
    PtyExited(Option<i32>),
}
