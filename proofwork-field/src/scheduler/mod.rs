//! Scheduler layer for the field engine
//!
//! Background loops that watch the network: a probe loop that keeps the
//! connectivity signal current, and a reconnect loop that kicks off a sync
//! every time the device comes back online.

pub mod connectivity;

pub use connectivity::{ApiProbe, ConnectivityMonitor, OnlineHandler, ReachabilityProbe};
