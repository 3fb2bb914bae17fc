//! Swarm (BitTorrent) transfers
//!
//! The engine only talks to the [`SwarmProvider`] traits; [`RqbitProvider`]
//! is the shipped implementation.

mod engine;
mod provider;
mod rqbit;

pub use engine::*;
pub use provider::*;
pub use rqbit::*;
