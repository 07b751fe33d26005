use {
  clap::{Parser, ValueEnum},
  sampler_simulator::{Faults, Scenario},
  sampler_view::{AgingPolicy, Config, Mode},
  std::net::SocketAddr,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
  Push,
  PushPull,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AgingArg {
  PureAge,
  OutDegreeDecay,
  InDegreeBias,
}

#[derive(Debug, Parser)]
#[clap(about = "Runs a population of peer-sampling nodes in one process")]
pub struct CliOptions {
  #[clap(long, default_value_t = 1000, help = "number of nodes")]
  nodes: usize,

  #[clap(long, default_value_t = 45, help = "number of gossip rounds")]
  rounds: usize,

  #[clap(
    long,
    default_value_t = 4,
    help = "number of bootstrap addresses new nodes are seeded with"
  )]
  bootstrap: usize,

  #[clap(long, default_value_t = 10)]
  size: usize,

  #[clap(long, default_value_t = 2)]
  heal: usize,

  #[clap(long, default_value_t = 3)]
  swap: usize,

  #[clap(long, default_value_t = 4)]
  indegree_ttl: u32,

  #[clap(long, default_value_t = 1)]
  indegree_age: u32,

  #[clap(long, value_enum, default_value = "pure-age")]
  aging: AgingArg,

  #[clap(long, value_enum, default_value = "push-pull")]
  mode: ModeArg,

  #[clap(long, default_value_t = 0.0, help = "message loss probability")]
  loss: f64,

  #[clap(
    long,
    default_value_t = 0.0,
    help = "probability that a message arrives one round late"
  )]
  delay: f64,

  #[clap(
    long,
    default_value_t = 0.0,
    help = "per-round probability that a node crashes"
  )]
  mortality: f64,

  #[clap(long, help = "seed for a reproducible run")]
  seed: Option<u64>,

  #[clap(long, help = "run every node in its own tokio task")]
  pub actors: bool,

  #[clap(
    long,
    requires = "actors",
    help = "share one random generator between all node tasks"
  )]
  pub shared_rng: bool,

  #[clap(long, help = "address to expose prometheus metrics on")]
  pub metrics: Option<SocketAddr>,
}

impl CliOptions {
  pub fn scenario(&self) -> Scenario {
    Scenario {
      nodes: self.nodes,
      bootstrap: self.bootstrap,
      rounds: self.rounds,
      mode: match self.mode {
        ModeArg::Push => Mode::Push,
        ModeArg::PushPull => Mode::PushPull,
      },
      faults: Faults {
        loss: self.loss,
        delay: self.delay,
        mortality: self.mortality,
      },
      seed: self.seed,
      view: Config {
        size: self.size,
        heal: self.heal,
        swap: self.swap,
        indegree_ttl: self.indegree_ttl,
        indegree_age: self.indegree_age,
        aging: match self.aging {
          AgingArg::PureAge => AgingPolicy::PureAge,
          AgingArg::OutDegreeDecay => AgingPolicy::OutDegreeDecay,
          AgingArg::InDegreeBias => AgingPolicy::InDegreeBias,
        },
        ..Default::default()
      },
    }
  }
}
