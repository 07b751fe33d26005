use {
  crate::config::RandomnessMode,
  parking_lot::Mutex,
  rand::{
    rngs::{SmallRng, StdRng},
    Rng,
    SeedableRng,
  },
  std::sync::Arc,
};

/// Uniform index generator driving every random choice a view makes.
///
/// Callers must never ask for an index into an empty range, a view
/// checks for emptiness and reports [`crate::Error::EmptyView`] before
/// it gets here.
pub trait RandomSource {
  /// Returns a uniformly distributed integer in `[0, n)`, `n > 0`.
  fn index(&mut self, n: usize) -> usize;

  /// Fisher-Yates shuffle on top of [`RandomSource::index`].
  fn shuffle<T>(&mut self, items: &mut [T])
  where
    Self: Sized,
  {
    for i in (1..items.len()).rev() {
      let j = self.index(i + 1);
      items.swap(i, j);
    }
  }
}

/// The generators a node can be configured with.
pub enum Randomness {
  Fast(SmallRng),
  Unpredictable(StdRng),
}

impl Randomness {
  pub fn fast(seed: u64) -> Self {
    Randomness::Fast(SmallRng::seed_from_u64(seed))
  }

  pub fn unpredictable() -> Self {
    Randomness::Unpredictable(StdRng::from_entropy())
  }
}

impl From<RandomnessMode> for Randomness {
  fn from(mode: RandomnessMode) -> Self {
    match mode {
      RandomnessMode::Fast { seed } => Randomness::fast(seed),
      RandomnessMode::Unpredictable => Randomness::unpredictable(),
    }
  }
}

impl std::fmt::Debug for Randomness {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Randomness::Fast(_) => write!(f, "Randomness::Fast"),
      Randomness::Unpredictable(_) => write!(f, "Randomness::Unpredictable"),
    }
  }
}

impl RandomSource for Randomness {
  fn index(&mut self, n: usize) -> usize {
    match self {
      Randomness::Fast(rng) => rng.gen_range(0..n),
      Randomness::Unpredictable(rng) => rng.gen_range(0..n),
    }
  }
}

/// A random source shared by many node actors.
///
/// Each view stays single-owner, only the generator behind it is
/// behind a lock. Cloning is cheap and every clone draws from the
/// same stream.
#[derive(Debug)]
pub struct Shared<R> {
  inner: Arc<Mutex<R>>,
}

impl<R> Shared<R> {
  pub fn new(source: R) -> Self {
    Self {
      inner: Arc::new(Mutex::new(source)),
    }
  }
}

impl<R> Clone for Shared<R> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<R: RandomSource> RandomSource for Shared<R> {
  fn index(&mut self, n: usize) -> usize {
    self.inner.lock().index(n)
  }
}

/// Replays a fixed list of indices, clamped to the requested range.
/// Once exhausted it starts over.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct Sequence {
  values: Vec<usize>,
  cursor: usize,
}

#[cfg(test)]
impl Sequence {
  pub fn new(values: impl Into<Vec<usize>>) -> Self {
    Self {
      values: values.into(),
      cursor: 0,
    }
  }

  /// Always picks the highest index, shuffles become the identity.
  pub fn highest() -> Self {
    Self::new(vec![usize::MAX])
  }
}

#[cfg(test)]
impl RandomSource for Sequence {
  fn index(&mut self, n: usize) -> usize {
    assert!(n > 0, "index requested from an empty range");
    let value = self.values[self.cursor % self.values.len()];
    self.cursor += 1;
    value.min(n - 1)
  }
}
