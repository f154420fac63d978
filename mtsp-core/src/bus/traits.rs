//! Core bus trait definitions

use super::message::AclMessage;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use tokio::sync::mpsc;

/// Unified delivery interface for agent coordination
#[async_trait]
pub trait MessageBus: Send + Sync + Debug {
    /// Register an agent name and obtain its mailbox
    async fn register(&self, name: &str) -> Result<Mailbox>;

    /// Remove an agent; its mailbox closes once drained
    async fn deregister(&self, name: &str) -> Result<()>;

    /// Deliver a message to its receiver
    async fn send(&self, message: AclMessage) -> Result<()>;

    /// Deliver a copy of the message to every registered agent except the sender.
    ///
    /// Returns the number of copies delivered.
    async fn broadcast(&self, message: AclMessage) -> Result<usize>;

    /// Registered agent names, sorted
    async fn agents(&self) -> Vec<String>;
}

/// Receiving end of an agent's queue
#[derive(Debug)]
pub struct Mailbox {
    name: String,
    rx: mpsc::UnboundedReceiver<AclMessage>,
}

impl Mailbox {
    pub(crate) fn new(name: String, rx: mpsc::UnboundedReceiver<AclMessage>) -> Self {
        Self { name, rx }
    }

    /// Owner of this mailbox
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next message; `None` once deregistered and drained
    pub async fn recv(&mut self) -> Option<AclMessage> {
        self.rx.recv().await
    }

    /// Take the next message if one is already queued
    pub fn try_recv(&mut self) -> Option<AclMessage> {
        self.rx.try_recv().ok()
    }
}
