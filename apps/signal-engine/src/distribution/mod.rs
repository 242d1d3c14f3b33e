//! Signal distribution: result caching, broadcast fan-out, and the
//! single-use entitlement tickets.

pub mod gateway;
pub mod hub;
pub mod ticket;

pub use gateway::DistributionGateway;
pub use hub::{SignalEnvelope, SignalHub};
pub use ticket::TicketGate;
