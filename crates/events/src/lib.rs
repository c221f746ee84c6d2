#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in forma
//!
//! All user-visible progress goes through events - no direct logging or
//! printing is allowed outside the CLI. Pipeline crates emit events over a
//! tokio channel; the CLI drains the channel concurrently with the running
//! operation and renders progress.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// Events emitted during formula processing and installation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Download lifecycle
    DownloadStarted {
        url: String,
        size: Option<u64>,
    },
    DownloadProgress {
        url: String,
        bytes_downloaded: u64,
        total_bytes: u64,
    },
    DownloadCompleted {
        url: String,
        bytes: u64,
    },
    DownloadFailed {
        url: String,
        error: String,
    },

    // Integrity
    IntegrityVerified {
        file: String,
        sha256: String,
    },

    // Build step
    ToolchainFound {
        name: String,
        path: String,
    },
    BuildStarting {
        package: String,
        command: String,
    },
    BuildCompleted {
        package: String,
    },

    // Placement
    Installing {
        package: String,
    },
    Installed {
        package: String,
        path: String,
    },

    // Post-install smoke test
    SmokeTestStarted {
        package: String,
    },
    SmokeTestPassed {
        package: String,
    },
    SmokeTestFailed {
        package: String,
        message: String,
    },

    // General
    Warning {
        message: String,
    },
    Debug {
        message: String,
    },
    Error {
        message: String,
    },
}

/// Type alias for event sender
pub type EventSender = UnboundedSender<Event>;

/// Type alias for event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<Event>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout forma
///
/// Implementors hold an optional sender; emission is fire-and-forget and a
/// dropped receiver never fails the operation.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: Event) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(Event::Debug {
            message: message.into(),
        });
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(Event::Warning {
            message: message.into(),
        });
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(Event::Error {
            message: message.into(),
        });
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}

impl EventEmitter for Option<&EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_delivery() {
        let (tx, mut rx) = channel();
        let emitter = Some(tx);
        emitter.emit_debug("hello");

        match rx.recv().await {
            Some(Event::Debug { message }) => assert_eq!(message, "hello"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_emit_without_receiver_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        let emitter = Some(tx);
        // Must not panic or error
        emitter.emit_warning("receiver gone");
    }
}
