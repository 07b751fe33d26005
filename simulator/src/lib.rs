//! In-process harness for the peer-sampling views.
//!
//! Boots a population of nodes, schedules gossip rounds over a lossy
//! in-memory transport (or inside one tokio task per node), injects
//! failures and reports on the shape of the resulting overlay.

pub mod actor;
pub mod network;
pub mod report;
pub mod scenario;
pub mod wire;

pub use {
  actor::Cluster,
  network::{Network, RoundStats},
  report::{Histogram, Overlay, Summary},
  scenario::{Faults, Scenario},
};
