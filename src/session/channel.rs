//! Connection channel abstraction
//!
//! The coordinator never talks to a socket directly. A transport implements
//! [`SessionChannel`] and hands its inbound events over an mpsc receiver.

use super::protocol::{ChannelCommand, ChannelEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel-level errors
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Channel is closed")]
    Closed,

    #[error("Failed to send '{command}': {reason}")]
    SendFailed { command: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Bidirectional link to the streaming service
#[async_trait]
pub trait SessionChannel: Send + Sync {
    /// Identifier used in logs
    fn id(&self) -> &str;

    /// Whether commands can currently be delivered
    fn is_open(&self) -> bool;

    /// Deliver a command to the service
    async fn send(&self, command: ChannelCommand) -> ChannelResult<()>;

    /// Take the inbound event stream. Returns `None` once taken.
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<ChannelEvent>>;
}

/// In-process channel used by tests and the replay tool.
///
/// Commands are recorded, events are pushed through [`MemoryChannel::injector`].
pub struct MemoryChannel {
    id: String,
    open: AtomicBool,
    sent: Mutex<Vec<ChannelCommand>>,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<ChannelEvent>>>,
}

/// Handle for pushing scripted events into a [`MemoryChannel`]
#[derive(Clone)]
pub struct EventInjector {
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl EventInjector {
    /// Queue an event. Returns false if the receiving side is gone.
    pub fn push(&self, event: ChannelEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

impl MemoryChannel {
    pub fn new(id: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            id: id.into(),
            open: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    pub fn injector(&self) -> EventInjector {
        EventInjector {
            tx: self.event_tx.clone(),
        }
    }

    /// Commands sent so far, in order
    pub fn sent(&self) -> Vec<ChannelCommand> {
        self.sent.lock().clone()
    }

    /// Flipping to false simulates a dropped link
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionChannel for MemoryChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send(&self, command: ChannelCommand) -> ChannelResult<()> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }
        tracing::debug!("[{}] -> {}", self.id, command.name());
        self.sent.lock().push(command);
        Ok(())
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<ChannelEvent>> {
        self.event_rx.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_channel_records_commands() {
        let channel = MemoryChannel::new("test");
        channel.send(ChannelCommand::StartAnalysis).await.unwrap();
        channel.send(ChannelCommand::StopAnalysis).await.unwrap();

        assert_eq!(
            channel.sent(),
            vec![ChannelCommand::StartAnalysis, ChannelCommand::StopAnalysis]
        );
    }

    #[tokio::test]
    async fn test_closed_channel_rejects_send() {
        let channel = MemoryChannel::new("test");
        channel.set_open(false);

        let err = channel.send(ChannelCommand::EndSession).await.unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn test_events_taken_once() {
        let channel = MemoryChannel::new("test");
        let injector = channel.injector();
        let mut events = channel.take_events().unwrap();
        assert!(channel.take_events().is_none());

        assert!(injector.push(ChannelEvent::SessionEnded));
        assert_eq!(events.recv().await, Some(ChannelEvent::SessionEnded));
    }
}
