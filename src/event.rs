//! Lifecycle events.

use async_trait::async_trait;
use entities_migrate::{Difference, MigrateResult, MigrationError, MigrationHandler, MigrationSession};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the event channel.
pub const EVENT_CAPACITY: usize = 64;

/// Signals emitted by a [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEvent {
    /// Startup finished and tables are usable.
    Ready {
        /// Tables were created from their models.
        created: bool,
        /// Differences were found and resolved.
        migrated: bool,
    },
    /// A storage operation failed.
    Error {
        /// Error description.
        message: String,
    },
    /// A manual migration was started.
    Migration {
        /// The differences handed to the migration handler.
        differences: Vec<Difference>,
    },
}

/// Sending half of the event channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ContextEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ContextEvent> {
        self.sender.subscribe()
    }

    /// Emit an event. Events without subscribers are dropped.
    pub fn emit(&self, event: ContextEvent) {
        if self.sender.send(event).is_err() {
            debug!("No event subscribers");
        }
    }

    /// Emit an error event.
    pub fn error(&self, error: &impl std::fmt::Display) {
        self.emit(ContextEvent::Error {
            message: error.to_string(),
        });
    }
}

/// Announces manual migrations on the bus, then hands them to the
/// caller's handler.
pub(crate) struct AnnouncingHandler {
    pub(crate) events: EventBus,
    pub(crate) inner: Option<Arc<dyn MigrationHandler>>,
}

#[async_trait]
impl MigrationHandler for AnnouncingHandler {
    async fn on_migration(
        &self,
        session: &mut MigrationSession,
        differences: &[Difference],
    ) -> MigrateResult<()> {
        self.events.emit(ContextEvent::Migration {
            differences: differences.to_vec(),
        });

        match &self.inner {
            Some(handler) => handler.on_migration(session, differences).await,
            None => Err(MigrationError::NoHandler {
                differences: differences.to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(ContextEvent::Ready {
            created: true,
            migrated: false,
        });
        bus.error(&"disk full");

        assert_eq!(
            rx.recv().await.unwrap(),
            ContextEvent::Ready {
                created: true,
                migrated: false
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            ContextEvent::Error {
                message: "disk full".into()
            }
        );
    }

    #[test]
    fn test_emit_without_subscribers() {
        EventBus::new().emit(ContextEvent::Error {
            message: "nobody listens".into(),
        });
    }
}
