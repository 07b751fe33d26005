use {
  serde::{Deserialize, Serialize},
  thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("view size must be at least 2, got {0}")]
  SizeTooSmall(usize),

  #[error("heal ({heal}) must not exceed view size ({size})")]
  HealTooLarge { heal: usize, size: usize },

  #[error("swap ({swap}) must not exceed view size ({size})")]
  SwapTooLarge { swap: usize, size: usize },
}

/// Strategy used to decide which of two descriptors is older.
///
/// Eviction, rotation and duplicate resolution all go through the
/// same comparison, so switching the policy changes every one of
/// them consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgingPolicy {
  /// Compare by age alone.
  #[default]
  PureAge,

  /// Descriptors whose reported out-degree is less than half of the
  /// view size are treated as `indegree_age` rounds younger.
  OutDegreeDecay,

  /// Descriptors reporting an in-degree above the view size are treated
  /// as `indegree_age` rounds older, those below it as that much younger.
  InDegreeBias,
}

/// Selects the generator behind [`crate::Randomness`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RandomnessMode {
  /// Seedable non-cryptographic generator. Runs with the same seed
  /// produce identical peer selections.
  Fast { seed: u64 },

  /// Cryptographically strong generator seeded from OS entropy, so an
  /// observer of gossip traffic cannot predict which peers get picked
  /// or evicted.
  #[default]
  Unpredictable,
}

/// Per-view configuration.
///
/// A value of this type is handed to every view at construction and
/// does not change for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  /// Steady-state number of descriptors in a view.
  pub size: usize,

  /// Number of oldest descriptors rotated to the tail before every push
  /// and evicted first when a merge overflows the view.
  pub heal: usize,

  /// Number of descriptors evicted from the front of the view when a
  /// merge still overflows after removing the oldest ones.
  pub swap: usize,

  /// Rounds after which a node that pushed to us stops counting
  /// towards our in-degree estimate.
  pub indegree_ttl: u32,

  /// Magnitude of the age adjustment applied by the degree-aware
  /// aging policies.
  pub indegree_age: u32,

  pub aging: AgingPolicy,

  pub randomness: RandomnessMode,
}

impl Config {
  /// Number of descriptors from the local view that accompany the
  /// self-descriptor in every push.
  pub fn push_window(&self) -> usize {
    (self.size / 2).saturating_sub(1)
  }

  pub fn validate(&self) -> Result<(), Error> {
    if self.size < 2 {
      return Err(Error::SizeTooSmall(self.size));
    }

    if self.heal > self.size {
      return Err(Error::HealTooLarge {
        heal: self.heal,
        size: self.size,
      });
    }

    if self.swap > self.size {
      return Err(Error::SwapTooLarge {
        swap: self.swap,
        size: self.size,
      });
    }

    Ok(())
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      size: 10,
      heal: 2,
      swap: 3,
      indegree_ttl: 4,
      indegree_age: 1,
      aging: AgingPolicy::PureAge,
      randomness: RandomnessMode::Unpredictable,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{Config, Error};

  #[test]
  fn default_is_valid() {
    let config = Config::default();
    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.push_window(), 4);
  }

  #[test]
  fn rejects_out_of_range_values() {
    let config = Config {
      size: 1,
      ..Default::default()
    };
    assert_eq!(config.validate(), Err(Error::SizeTooSmall(1)));

    let config = Config {
      heal: 11,
      ..Default::default()
    };
    assert_eq!(
      config.validate(),
      Err(Error::HealTooLarge { heal: 11, size: 10 })
    );

    let config = Config {
      swap: 12,
      ..Default::default()
    };
    assert_eq!(
      config.validate(),
      Err(Error::SwapTooLarge { swap: 12, size: 10 })
    );
  }

  #[test]
  fn tiny_views_push_only_themselves() {
    let config = Config {
      size: 2,
      heal: 1,
      swap: 1,
      ..Default::default()
    };
    assert_eq!(config.push_window(), 0);
  }
}
