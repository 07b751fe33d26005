use {
  crate::{
    report::Overlay,
    scenario::{Error, Faults, Scenario},
    wire,
  },
  bytes::Bytes,
  metrics::{gauge, increment_counter},
  rand::{rngs::SmallRng, seq::SliceRandom, Rng},
  sampler_view::{
    Addr,
    Error as ViewError,
    Message,
    Mode,
    Outcome,
    Transport,
    View,
  },
  std::collections::BTreeMap,
  thiserror::Error,
  tracing::{debug, info, warn},
};

/// Reasons a message did not make it to its recipient.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("{0} is not alive")]
  Unreachable(Addr),

  #[error("message to {0} dropped")]
  Dropped(Addr),

  #[error("{0} rejected the message: {1}")]
  Rejected(Addr, ViewError),

  #[error(transparent)]
  Wire(#[from] wire::Error),
}

/// Per-round tally of what happened to the gossip rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundStats {
  pub pushed: usize,
  pub exchanged: usize,
  pub lost: usize,
  pub delayed: usize,
  pub failed: usize,
  pub died: usize,
}

impl RoundStats {
  fn record(&mut self, outcome: Outcome) {
    match outcome {
      Outcome::Pushed => self.pushed += 1,
      Outcome::Exchanged { .. } => self.exchanged += 1,
      Outcome::Lost => self.lost += 1,
    }
  }

  fn merge(&mut self, other: RoundStats) {
    self.pushed += other.pushed;
    self.exchanged += other.exchanged;
    self.lost += other.lost;
    self.delayed += other.delayed;
    self.failed += other.failed;
    self.died += other.died;
  }
}

/// A population of views gossiping over an in-memory transport.
///
/// Rounds are scheduled sequentially, every live node initiates one
/// exchange per round in a random order. Views only see each other
/// through encoded messages.
pub struct Network {
  mode: Mode,
  faults: Faults,
  nodes: BTreeMap<Addr, View>,

  /// Messages held back by the transport until the next round.
  delayed: Vec<(Addr, Bytes)>,

  /// Drives scheduling order and fault injection.
  rng: SmallRng,

  round: usize,
}

impl Network {
  /// Boots every node of the scenario, each one knowing only its
  /// bootstrap address.
  pub fn boot(scenario: &Scenario) -> Result<Self, Error> {
    scenario.validate()?;

    let nodes = (0..scenario.nodes)
      .map(|i| -> Result<_, Error> {
        let addr = Scenario::addr(i);
        let config = scenario.view_config(i);
        let view = View::new(addr.clone(), scenario.seed_of(i), config)?;
        Ok((addr, view))
      })
      .collect::<Result<_, Error>>()?;

    info!(
      "booted {} nodes from {} bootstrap addresses ({:?})",
      scenario.nodes, scenario.bootstrap, scenario.mode
    );

    Ok(Self {
      mode: scenario.mode,
      faults: scenario.faults,
      nodes,
      delayed: Vec::new(),
      rng: scenario.harness_rng(),
      round: 0,
    })
  }

  pub fn nodes(&self) -> &BTreeMap<Addr, View> {
    &self.nodes
  }

  pub fn get(&self, addr: &Addr) -> Option<&View> {
    self.nodes.get(addr)
  }

  /// Number of completed rounds.
  pub fn round_count(&self) -> usize {
    self.round
  }

  /// Crashes a node. Its address may linger in other views.
  pub fn kill(&mut self, addr: &Addr) -> bool {
    self.nodes.remove(addr).is_some()
  }

  pub fn set_faults(&mut self, faults: Faults) -> Result<(), Error> {
    faults.validate()?;
    self.faults = faults;
    Ok(())
  }

  /// Runs one round: delayed messages from the previous round land
  /// first, then every live node gets one turn.
  pub fn round(&mut self) -> RoundStats {
    let mut stats = RoundStats::default();
    self.round += 1;

    for (to, bytes) in std::mem::take(&mut self.delayed) {
      if let Err(e) = self.deliver_late(&to, &bytes) {
        debug!("late delivery to {to} failed: {e}");
      }
    }

    let mut order: Vec<Addr> = self.nodes.keys().cloned().collect();
    order.shuffle(&mut self.rng);

    for addr in order {
      if chance(&mut self.rng, self.faults.mortality) {
        if self.kill(&addr) {
          debug!("round {}: {addr} crashed", self.round);
          stats.died += 1;
        }
        continue;
      }

      // the initiator is taken out of the population for the duration of
      // its turn, a node gossiping with itself finds nobody home.
      let Some(mut view) = self.nodes.remove(&addr) else {
        continue;
      };

      let mut transport = Lossy {
        nodes: &mut self.nodes,
        faults: self.faults,
        rng: &mut self.rng,
        delayed: &mut self.delayed,
      };

      match view.gossip(self.mode, &mut transport) {
        Ok(outcome) => stats.record(outcome),
        Err(e) => {
          warn!("round {}: {addr} failed to gossip: {e}", self.round);
          stats.failed += 1;
        }
      }

      self.nodes.insert(addr, view);
    }

    stats.delayed = self.delayed.len();
    gauge!("simulation_live_nodes", self.nodes.len() as f64);
    increment_counter!("simulation_rounds");
    debug!("round {}: {stats:?}", self.round);
    stats
  }

  /// Runs `rounds` rounds and returns the accumulated tally.
  pub fn run(&mut self, rounds: usize) -> RoundStats {
    let mut total = RoundStats::default();
    for _ in 0..rounds {
      total.merge(self.round());
    }
    total
  }

  pub fn overlay(&self) -> Overlay {
    Overlay::new(self.nodes.iter().map(|(addr, view)| (addr, view.peers())))
  }

  /// Delivers a message held back during the previous round. Replies to
  /// late push-pull requests have nobody waiting for them and are
  /// discarded.
  fn deliver_late(
    &mut self,
    to: &Addr,
    bytes: &[u8],
  ) -> Result<(), TransportError> {
    let view = self
      .nodes
      .get_mut(to)
      .ok_or_else(|| TransportError::Unreachable(to.clone()))?;
    view
      .handle(wire::decode(bytes)?)
      .map_err(|e| TransportError::Rejected(to.clone(), e))?;
    Ok(())
  }
}

/// Synchronous transport over the live population that drops, delays
/// and loses messages according to the configured faults.
struct Lossy<'a> {
  nodes: &'a mut BTreeMap<Addr, View>,
  faults: Faults,
  rng: &'a mut SmallRng,
  delayed: &'a mut Vec<(Addr, Bytes)>,
}

impl<'a> Lossy<'a> {
  fn chance(&mut self, probability: f64) -> bool {
    chance(self.rng, probability)
  }
}

fn chance(rng: &mut SmallRng, probability: f64) -> bool {
  probability > 0.0 && rng.gen_bool(probability)
}

impl<'a> Transport for Lossy<'a> {
  type Error = TransportError;

  fn send(
    &mut self,
    to: &Addr,
    message: Message,
  ) -> Result<Option<Message>, Self::Error> {
    let bytes = wire::encode(&message)?;

    if !self.nodes.contains_key(to) {
      return Err(TransportError::Unreachable(to.clone()));
    }

    if self.chance(self.faults.loss) {
      return Err(TransportError::Dropped(to.clone()));
    }

    if self.chance(self.faults.delay) {
      self.delayed.push((to.clone(), bytes));
      return Ok(None);
    }

    let view = self
      .nodes
      .get_mut(to)
      .ok_or_else(|| TransportError::Unreachable(to.clone()))?;

    let reply = view
      .handle(wire::decode(&bytes)?)
      .map_err(|e| TransportError::Rejected(to.clone(), e))?;

    match reply {
      Some(reply) => {
        let bytes = wire::encode(&reply)?;
        if self.chance(self.faults.loss) {
          return Err(TransportError::Dropped(to.clone()));
        }
        Ok(Some(wire::decode(&bytes)?))
      }
      None => Ok(None),
    }
  }
}
