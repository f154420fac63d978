//! Token-ring protocol
//!
//! Each round one leader originates a [`Proposal`], every other agent refines
//! it exactly once in ring order, and the leader selects the single cheapest
//! `(agent, node)` pair when the token comes back.

mod proposal;
mod round;

pub use proposal::{Offer, Proposal};
pub use round::{RoundOutcome, RoundState, RoundTracker};
