//! Domain types and the ports through which the orchestrator reaches its
//! collaborators.

pub mod account;
pub mod notification;
pub mod ports;
pub mod transaction;
