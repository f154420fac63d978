//! Message bus for agent-to-agent delivery
//!
//! Agents address each other by name (`Salesman-3`). The bus provides:
//! - Point-to-point delivery, FIFO per sender/receiver pair
//! - Broadcast to every registered agent except the sender
//! - One mailbox per registered agent
//!
//! There is no ordering between messages from different senders.

mod error;
mod local;
mod message;
mod traits;

pub use error::BusError;
pub use local::LocalBus;
pub use message::{AclMessage, Performative};
pub use traits::{Mailbox, MessageBus};
