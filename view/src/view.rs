use {
  crate::{
    config::{Config, Error as ConfigError},
    descriptor::{Addr, Buffer, PeerDescriptor},
    indegree::InDegree,
    older::older,
    random::{RandomSource, Randomness},
  },
  metrics::counter,
  std::collections::{hash_map::Entry, HashMap, HashSet},
  thiserror::Error,
  tracing::trace,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  /// Selecting from an empty view. A view is seeded with one entry and
  /// eviction never goes below the configured size, so this indicates
  /// a broken invariant rather than a runtime condition.
  #[error("partial view is empty")]
  EmptyView,

  /// A received buffer must start with the sender's own descriptor.
  #[error("received buffer is empty, sender descriptor is missing")]
  MalformedBuffer,
}

/// The partial view of a single node.
///
/// A view is driven by exactly one actor. Every mutating operation
/// takes `&mut self`, nodes interact only by exchanging copies of
/// [`Buffer`]s produced by [`View::push`].
#[derive(Debug)]
pub struct View<R = Randomness> {
  /// Immutable per-view tunables.
  config: Config,

  /// Identity of the node owning this view.
  addr: Addr,

  /// The bounded partial view, unique by address after every merge.
  peers: Buffer,

  /// Peers that recently pushed to us.
  in_degree: InDegree,

  rng: R,
}

impl View {
  /// Creates a view for `addr` that knows only about `seed`.
  ///
  /// The random generator is picked according to
  /// [`Config::randomness`]. Fails if the configuration is invalid.
  pub fn new(
    addr: impl Into<Addr>,
    seed: impl Into<Addr>,
    config: Config,
  ) -> Result<Self, ConfigError> {
    let rng = Randomness::from(config.randomness);
    Self::with_random(addr, seed, config, rng)
  }
}

// Public API
impl<R: RandomSource> View<R> {
  /// Creates a view that draws all of its random choices from `rng`.
  pub fn with_random(
    addr: impl Into<Addr>,
    seed: impl Into<Addr>,
    config: Config,
    rng: R,
  ) -> Result<Self, ConfigError> {
    config.validate()?;
    Ok(Self {
      addr: addr.into(),
      peers: vec![PeerDescriptor::new(seed, 0, 0, 1)],
      in_degree: InDegree::new(config.indegree_ttl),
      config,
      rng,
    })
  }

  pub fn addr(&self) -> &Addr {
    &self.addr
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn peers(&self) -> &[PeerDescriptor] {
    &self.peers
  }

  pub fn in_degree(&self) -> &InDegree {
    &self.in_degree
  }

  pub fn len(&self) -> usize {
    self.peers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.peers.is_empty()
  }

  pub fn contains(&self, addr: &Addr) -> bool {
    self.peers.iter().any(|d| &d.addr == addr)
  }

  /// Picks the peer to gossip with in this round.
  ///
  /// This is the entry carrying the oldest information, so the stalest
  /// parts of the view get refreshed first. Ties go to the lowest
  /// position in the view.
  pub fn select_peer(&self) -> Result<PeerDescriptor, Error> {
    let mut candidates = self.peers.iter();
    let mut oldest = candidates.next().ok_or(Error::EmptyView)?;
    for d in candidates {
      if d.age > oldest.age {
        oldest = d;
      }
    }
    Ok(oldest.clone())
  }

  /// Builds the buffer sent to `target`.
  ///
  /// The buffer starts with a fresh descriptor of this node followed by
  /// a sample of the view taken after a random permutation and after
  /// rotating the oldest entries to the tail. Descriptors of `target`
  /// itself are never included. Membership of the view does not change,
  /// only its order and the ages, which advance by one round.
  pub fn push(&mut self, target: &Addr) -> Result<Buffer, Error> {
    if self.peers.is_empty() {
      return Err(Error::EmptyView);
    }

    let window = self.config.push_window();
    let mut buffer = Buffer::with_capacity(window + 1);
    buffer.push(PeerDescriptor::fresh(
      self.addr.clone(),
      saturating_u32(self.in_degree.estimate()),
      saturating_u32(self.peers.len()),
    ));

    self.permute();
    self.age_out();

    buffer.extend(
      self
        .peers
        .iter()
        .filter(|d| &d.addr != target)
        .take(window)
        .cloned(),
    );

    self.increase_age();

    trace!(
      "{}: push to {target} with {} descriptors",
      self.addr,
      buffer.len()
    );
    Ok(buffer)
  }

  /// Merges a buffer pushed to us and credits its sender in the
  /// in-degree estimate.
  ///
  /// The first descriptor of a pushed buffer is always the sender's own,
  /// an empty buffer is rejected before the view is touched.
  pub fn receive(&mut self, buffer: Buffer) -> Result<(), Error> {
    let sender = buffer
      .first()
      .map(|d| d.addr.clone())
      .ok_or(Error::MalformedBuffer)?;

    self.select(buffer);
    self.in_degree.record(&sender);
    Ok(())
  }

  /// Reconciles an incoming buffer with the local view.
  ///
  /// Stages run in a fixed order: append, drop duplicates keeping the
  /// freshest entry, evict up to `heal` oldest, evict up to `swap` from
  /// the front and finally evict random entries until the view is back
  /// at its configured size.
  pub fn select(&mut self, buffer: Buffer) {
    self.peers.extend(buffer);

    let duplicates = self.rm_duplicates();
    let old = self.rm_old();
    let head = self.rm_head();
    let random = self.rm_rand();

    counter!("view_duplicates_dropped", duplicates as u64);
    counter!("view_evicted_old", old as u64);
    counter!("view_evicted_head", head as u64);
    counter!("view_evicted_random", random as u64);

    trace!(
      "{}: merged view of {} (dup: {duplicates}, old: {old}, head: {head}, \
       rand: {random})",
      self.addr,
      self.peers.len()
    );
  }

  /// Moves the `heal` oldest descriptors to the tail of the view, where
  /// they are least likely to be picked by the next push.
  pub fn age_out(&mut self) {
    let count = self.config.heal.min(self.peers.len());
    let mut rotated = Buffer::with_capacity(count);
    for _ in 0..count {
      if let Some(d) = self.rm_max_age() {
        rotated.push(d);
      }
    }
    self.peers.extend(rotated);
  }

  /// Shuffles the view uniformly.
  pub fn permute(&mut self) {
    self.rng.shuffle(&mut self.peers);
  }

  /// Advances every descriptor by one round.
  pub fn increase_age(&mut self) {
    for d in self.peers.iter_mut() {
      d.age = d.age.saturating_add(1);
    }
  }
}

// eviction stages
impl<R: RandomSource> View<R> {
  fn overflow(&self) -> usize {
    self.peers.len().saturating_sub(self.config.size)
  }

  /// Keeps one descriptor per address, the one no other descriptor with
  /// that address is fresher than. Among equals the first one wins.
  /// Survivors keep their positions. Returns the number dropped.
  pub(crate) fn rm_duplicates(&mut self) -> usize {
    let mut winners: HashMap<&Addr, usize> = HashMap::new();
    for (i, d) in self.peers.iter().enumerate() {
      match winners.entry(&d.addr) {
        Entry::Vacant(v) => {
          v.insert(i);
        }
        Entry::Occupied(mut o) => {
          if older(&self.config, &self.peers[*o.get()], d) {
            o.insert(i);
          }
        }
      }
    }

    if winners.len() == self.peers.len() {
      return 0;
    }

    let keep: HashSet<usize> = winners.into_values().collect();
    let before = self.peers.len();
    self.peers = std::mem::take(&mut self.peers)
      .into_iter()
      .enumerate()
      .filter(|(i, _)| keep.contains(i))
      .map(|(_, d)| d)
      .collect();
    before - self.peers.len()
  }

  /// Removes and returns the oldest descriptor, the first one among
  /// equally old entries.
  pub(crate) fn rm_max_age(&mut self) -> Option<PeerDescriptor> {
    let mut oldest = 0;
    for (i, d) in self.peers.iter().enumerate().skip(1) {
      if older(&self.config, d, &self.peers[oldest]) {
        oldest = i;
      }
    }

    if self.peers.is_empty() {
      None
    } else {
      Some(self.peers.remove(oldest))
    }
  }

  fn rm_old(&mut self) -> usize {
    let count = self.config.heal.min(self.overflow());
    for _ in 0..count {
      self.rm_max_age();
    }
    count
  }

  fn rm_head(&mut self) -> usize {
    let count = self.config.swap.min(self.overflow());
    self.peers.drain(..count);
    count
  }

  fn rm_rand(&mut self) -> usize {
    let mut count = 0;
    while self.peers.len() > self.config.size {
      let victim = self.rng.index(self.peers.len());
      self.peers.remove(victim);
      count += 1;
    }
    count
  }
}

#[cfg(test)]
impl<R> View<R> {
  pub(crate) fn peers_mut(&mut self) -> &mut Buffer {
    &mut self.peers
  }

  pub(crate) fn config_mut(&mut self) -> &mut Config {
    &mut self.config
  }
}

fn saturating_u32(value: usize) -> u32 {
  u32::try_from(value).unwrap_or(u32::MAX)
}
