use {
  serde::{Deserialize, Serialize},
  std::{
    borrow::Borrow,
    fmt::{Debug, Display},
    str::FromStr,
  },
};

/// Logical identity of a node in the overlay.
///
/// Addresses are opaque to the sampling protocol, they are only
/// compared for equality and handed back to the transport when a
/// gossip target is chosen.
#[derive(
  Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Addr(String);

impl Addr {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Display for Addr {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Debug for Addr {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "addr({})", self.0)
  }
}

impl From<&str> for Addr {
  fn from(value: &str) -> Self {
    Addr(value.to_owned())
  }
}

impl From<String> for Addr {
  fn from(value: String) -> Self {
    Addr(value)
  }
}

impl From<Addr> for String {
  fn from(addr: Addr) -> Self {
    addr.0
  }
}

impl FromStr for Addr {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Addr(s.to_owned()))
  }
}

impl Borrow<str> for Addr {
  fn borrow(&self) -> &str {
    &self.0
  }
}

impl PartialEq<str> for Addr {
  fn eq(&self, other: &str) -> bool {
    self.0 == other
  }
}

impl PartialEq<&str> for Addr {
  fn eq(&self, other: &&str) -> bool {
    self.0 == *other
  }
}

/// One entry of a partial view.
///
/// Degree values are hints reported (or estimated) by the node that
/// created the descriptor. They are frozen at creation time and only
/// replaced when a fresher descriptor for the same address arrives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerDescriptor {
  /// Identity of the described node.
  pub addr: Addr,

  /// Gossip rounds elapsed since the owning node created this entry.
  pub age: u32,

  /// In-degree estimate of the described node when it created this entry.
  pub in_degree: u32,

  /// Number of entries in the described node's view when it created this
  /// entry.
  pub out_degree: u32,
}

impl PeerDescriptor {
  pub fn new(
    addr: impl Into<Addr>,
    age: u32,
    in_degree: u32,
    out_degree: u32,
  ) -> Self {
    Self {
      addr: addr.into(),
      age,
      in_degree,
      out_degree,
    }
  }

  /// A descriptor a node creates about itself when pushing.
  pub fn fresh(addr: Addr, in_degree: u32, out_degree: u32) -> Self {
    Self {
      addr,
      age: 0,
      in_degree,
      out_degree,
    }
  }
}

/// Ordered sequence of descriptors.
///
/// Used both for the local partial view and for buffers exchanged
/// between nodes. Buffers produced by a push always start with the
/// sender's own descriptor.
pub type Buffer = Vec<PeerDescriptor>;
