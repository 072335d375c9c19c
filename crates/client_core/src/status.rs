//! Inline status lines with auto-dismiss timers.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

pub const SAVE_STATUS_DISMISS: Duration = Duration::from_secs(3);
pub const IMPORT_STATUS_DISMISS: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    pub set_at: DateTime<Utc>,
    serial: u64,
}

impl StatusMessage {
    pub fn is_success(&self) -> bool {
        self.kind == StatusKind::Success
    }
}

/// A single status slot. Setting a message replaces the previous one and
/// reschedules the dismiss timer; dropping the line aborts any pending timer.
pub struct StatusLine {
    tx: Arc<watch::Sender<Option<StatusMessage>>>,
    dismiss_after: Duration,
    timer: Option<JoinHandle<()>>,
    serial: u64,
}

impl StatusLine {
    pub fn new(dismiss_after: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            dismiss_after,
            timer: None,
            serial: 0,
        }
    }

    pub fn current(&self) -> Option<StatusMessage> {
        self.tx.borrow().clone()
    }

    pub fn text(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|message| message.text.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StatusMessage>> {
        self.tx.subscribe()
    }

    fn publish(&mut self, kind: StatusKind, text: String) -> u64 {
        self.cancel_timer();
        self.serial += 1;
        self.tx.send_replace(Some(StatusMessage {
            kind,
            text,
            set_at: Utc::now(),
            serial: self.serial,
        }));
        self.serial
    }

    /// Shows a message that stays until the next one replaces it.
    pub fn pin(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.publish(kind, text.into());
    }

    pub fn show(&mut self, kind: StatusKind, text: impl Into<String>) {
        let serial = self.publish(kind, text.into());

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime; status will not auto-dismiss");
            return;
        };
        let tx = Arc::clone(&self.tx);
        let delay = self.dismiss_after;
        self.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_if_modified(|current| match current {
                Some(message) if message.serial == serial => {
                    *current = None;
                    true
                }
                _ => false,
            });
        }));
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.show(StatusKind::Success, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.show(StatusKind::Error, text);
    }

    pub fn clear(&mut self) {
        self.cancel_timer();
        self.tx.send_replace(None);
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for StatusLine {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
