use {crate::descriptor::Addr, std::collections::HashMap};

/// Approximates how many peers currently point at this node.
///
/// A node cannot observe its global in-degree, so it counts the
/// distinct peers that pushed to it within the last `ttl` pushes it
/// received. The same peer pushing twice inside that window is
/// counted once.
#[derive(Debug, Clone, Default)]
pub struct InDegree {
  ttl: u32,
  seen: HashMap<Addr, u32>,
}

impl InDegree {
  pub fn new(ttl: u32) -> Self {
    Self {
      ttl,
      seen: HashMap::new(),
    }
  }

  /// Records a push from `sender`.
  ///
  /// Every other tracked pusher ages by one round and those past the
  /// ttl are forgotten.
  pub fn record(&mut self, sender: &Addr) {
    for age in self.seen.values_mut() {
      *age = age.saturating_add(1);
    }
    self.seen.insert(sender.clone(), 0);

    let ttl = self.ttl;
    self.seen.retain(|_, age| *age <= ttl);
  }

  /// Current estimate, reported in outgoing self-descriptors.
  pub fn estimate(&self) -> usize {
    self.seen.len()
  }

  pub fn contains(&self, addr: &Addr) -> bool {
    self.seen.contains_key(addr)
  }

  /// Rounds since `addr` last pushed to us, if still tracked.
  pub fn age_of(&self, addr: &Addr) -> Option<u32> {
    self.seen.get(addr).copied()
  }
}
