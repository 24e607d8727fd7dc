//! Notification sinks: where finished notifications go.

use std::io::Write;

use tokio::sync::mpsc;

use crate::display::DisplayText;
use crate::types::Notification;

/// Receives notifications from the aggregator. Must not block.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: Notification);
}

/// Forwards notifications over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn deliver(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("Notification receiver dropped");
        }
    }
}

/// Prints the rendered display lines to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn deliver(&self, notification: Notification) {
        let text = DisplayText::render(&notification);
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}\n{}\n{}\n", text.status, text.detail, text.city) {
            tracing::warn!("Failed to write notification: {}", e);
        }
    }
}

/// Prints each notification as one JSON line.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSink;

impl NotificationSink for JsonSink {
    fn deliver(&self, notification: Notification) {
        match serde_json::to_string(&notification) {
            Ok(line) => {
                let mut out = std::io::stdout().lock();
                if let Err(e) = writeln!(out, "{}", line) {
                    tracing::warn!("Failed to write notification: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize notification: {}", e),
        }
    }
}
