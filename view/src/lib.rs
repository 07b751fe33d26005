//! Gossip-based peer sampling.
//!
//! Every node keeps a small bounded partial view of other nodes and
//! periodically exchanges fragments of it with one sampled peer. The
//! union of all partial views forms a connected, well-mixed random
//! overlay without any central membership list.

mod config;
mod descriptor;
mod exchange;
mod indegree;
mod older;
mod random;
mod view;

pub use {
  config::{AgingPolicy, Config, Error as ConfigError, RandomnessMode},
  descriptor::{Addr, Buffer, PeerDescriptor},
  exchange::{Message, Mode, Outcome, Transport},
  indegree::InDegree,
  older::older,
  random::{RandomSource, Randomness, Shared},
  view::{Error, View},
};

#[cfg(test)]
pub(crate) use random::Sequence;
