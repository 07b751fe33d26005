use {
  rand::{rngs::SmallRng, SeedableRng},
  sampler_view::{Addr, Config, ConfigError, Mode, RandomnessMode},
  thiserror::Error,
};

#[derive(Debug, Error, PartialEq)]
pub enum Error {
  #[error("a simulation needs at least one node")]
  NoNodes,

  #[error("{bootstrap} bootstrap nodes requested out of {nodes} nodes")]
  BootstrapOutOfRange { bootstrap: usize, nodes: usize },

  #[error("{name} must be a probability in [0, 1], got {value}")]
  InvalidProbability { name: &'static str, value: f64 },

  #[error("invalid view configuration: {0}")]
  View(#[from] ConfigError),
}

/// Failure injection knobs, each one a per-event probability.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Faults {
  /// A message (or a reply) is dropped by the transport.
  pub loss: f64,

  /// A message is held back and delivered at the start of the next
  /// round. The reply to a delayed push-pull request is lost.
  pub delay: f64,

  /// A live node crashes at the start of its turn in a round.
  pub mortality: f64,
}

impl Faults {
  pub fn validate(&self) -> Result<(), Error> {
    for (name, value) in [
      ("loss", self.loss),
      ("delay", self.delay),
      ("mortality", self.mortality),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(Error::InvalidProbability { name, value });
      }
    }
    Ok(())
  }
}

/// Everything needed to boot and drive a population of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
  /// Population size. Nodes are named `n0` to `n{nodes - 1}`.
  pub nodes: usize,

  /// Node `i` is seeded with the address of node `i % bootstrap`.
  pub bootstrap: usize,

  /// Number of gossip rounds to run.
  pub rounds: usize,

  pub mode: Mode,

  pub faults: Faults,

  /// When set, every random choice of the run (views, scheduling and
  /// faults) is derived from this seed and the run is reproducible.
  /// Otherwise views use the unpredictable generator.
  pub seed: Option<u64>,

  /// Configuration shared by all views.
  pub view: Config,
}

impl Scenario {
  pub fn validate(&self) -> Result<(), Error> {
    if self.nodes == 0 {
      return Err(Error::NoNodes);
    }

    if self.bootstrap == 0 || self.bootstrap > self.nodes {
      return Err(Error::BootstrapOutOfRange {
        bootstrap: self.bootstrap,
        nodes: self.nodes,
      });
    }

    self.faults.validate()?;
    self.view.validate()?;
    Ok(())
  }

  pub fn addr(index: usize) -> Addr {
    format!("n{index}").into()
  }

  /// Address node `index` knows about when it starts.
  ///
  /// Ordinary nodes know one bootstrap node. Bootstrap nodes know the
  /// next one in a ring, so the initial graph is a single component.
  pub fn seed_of(&self, index: usize) -> Addr {
    if index < self.bootstrap {
      Self::addr((index + 1) % self.bootstrap)
    } else {
      Self::addr(index % self.bootstrap)
    }
  }

  /// View configuration of node `index`.
  ///
  /// Seeded runs give each node its own stream derived from the run
  /// seed, so nodes do not make identical choices.
  pub fn view_config(&self, index: usize) -> Config {
    let randomness = match self.seed {
      Some(seed) => RandomnessMode::Fast {
        seed: seed.wrapping_add(index as u64 + 1),
      },
      None => RandomnessMode::Unpredictable,
    };

    Config {
      randomness,
      ..self.view.clone()
    }
  }

  /// Generator used by the harness itself for scheduling and faults.
  pub fn harness_rng(&self) -> SmallRng {
    match self.seed {
      Some(seed) => SmallRng::seed_from_u64(seed),
      None => SmallRng::from_entropy(),
    }
  }
}

impl Default for Scenario {
  fn default() -> Self {
    Self {
      nodes: 1000,
      bootstrap: 4,
      rounds: 45,
      mode: Mode::PushPull,
      faults: Faults::default(),
      seed: None,
      view: Config::default(),
    }
  }
}
