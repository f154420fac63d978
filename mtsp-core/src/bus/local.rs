//! In-process bus implementation
//!
//! Each registered agent owns an unbounded tokio channel. Unbounded queues
//! keep a sender from ever blocking inside a handler, which would otherwise
//! allow two agents to wait on each other's full mailboxes.

use super::error::BusError;
use super::message::AclMessage;
use super::traits::{Mailbox, MessageBus};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::trace;

/// Local bus routing by agent name
#[derive(Debug, Clone, Default)]
pub struct LocalBus {
    /// Map of agent names to their mailbox senders
    routes: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<AclMessage>>>>,
}

impl LocalBus {
    /// Create a new empty bus
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn register(&self, name: &str) -> Result<Mailbox> {
        if name.is_empty() {
            return Err(BusError::InvalidName("Agent name cannot be empty".to_string()).into());
        }

        let mut routes = self.routes.write().await;
        if routes.contains_key(name) {
            return Err(BusError::AlreadyRegistered(name.to_string()).into());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        routes.insert(name.to_string(), tx);
        Ok(Mailbox::new(name.to_string(), rx))
    }

    async fn deregister(&self, name: &str) -> Result<()> {
        self.routes
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BusError::UnknownRecipient(name.to_string()).into())
    }

    async fn send(&self, message: AclMessage) -> Result<()> {
        let receiver = message.receiver.clone().ok_or(BusError::MissingReceiver)?;
        let routes = self.routes.read().await;
        let tx = routes
            .get(&receiver)
            .ok_or_else(|| BusError::UnknownRecipient(receiver.clone()))?;

        trace!(%message, "send");
        tx.send(message)
            .map_err(|_| BusError::MailboxClosed(receiver).into())
    }

    async fn broadcast(&self, message: AclMessage) -> Result<usize> {
        let routes = self.routes.read().await;
        let mut delivered = 0;

        for (name, tx) in routes.iter() {
            if *name == message.sender {
                continue;
            }
            let copy = message.clone().to(name.clone());
            trace!(message = %copy, "broadcast");
            // A closed mailbox belongs to an agent that already stopped
            if tx.send(copy).is_ok() {
                delivered += 1;
            }
        }

        Ok(delivered)
    }

    async fn agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routes.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Performative;
    use crate::error::MtspError;

    fn inform(sender: &str, content: &str) -> AclMessage {
        AclMessage::new(Performative::Inform, "test", sender, content)
    }

    #[tokio::test]
    async fn test_point_to_point_fifo() {
        let bus = LocalBus::new();
        let _a = bus.register("a").await.unwrap();
        let mut b = bus.register("b").await.unwrap();

        for i in 0..5 {
            bus.send(inform("a", &i.to_string()).to("b")).await.unwrap();
        }

        for i in 0..5 {
            let message = b.recv().await.unwrap();
            assert_eq!(message.content, i.to_string());
            assert_eq!(message.receiver.as_deref(), Some("b"));
        }
        assert!(b.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_broadcast_skips_sender() {
        let bus = LocalBus::new();
        let mut a = bus.register("a").await.unwrap();
        let mut b = bus.register("b").await.unwrap();
        let mut c = bus.register("c").await.unwrap();

        let delivered = bus.broadcast(inform("a", "hello")).await.unwrap();
        assert_eq!(delivered, 2);

        assert_eq!(b.recv().await.unwrap().receiver.as_deref(), Some("b"));
        assert_eq!(c.recv().await.unwrap().receiver.as_deref(), Some("c"));
        assert!(a.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unknown_recipient() {
        let bus = LocalBus::new();
        let err = bus.send(inform("a", "x").to("nobody")).await.unwrap_err();
        assert!(matches!(err, MtspError::Bus(_)));

        let err = bus.send(inform("a", "x")).await.unwrap_err();
        assert!(matches!(err, MtspError::Bus(_)));
    }

    #[tokio::test]
    async fn test_register_rules() {
        let bus = LocalBus::new();
        bus.register("a").await.unwrap();
        assert!(bus.register("a").await.is_err());
        assert!(matches!(
            bus.register("").await.unwrap_err(),
            MtspError::InvalidAgentName(_)
        ));
        assert_eq!(bus.agents().await, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_deregister_closes_mailbox() {
        let bus = LocalBus::new();
        let mut a = bus.register("a").await.unwrap();
        bus.send(inform("x", "last").to("a")).await.unwrap();
        bus.deregister("a").await.unwrap();

        assert_eq!(a.recv().await.unwrap().content, "last");
        assert!(a.recv().await.is_none());
        assert!(bus.deregister("a").await.is_err());
        assert!(bus.agents().await.is_empty());
    }
}
