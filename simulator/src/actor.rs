//! One tokio task per node.
//!
//! Each node owns its view inside its own task and is only reachable
//! through an unbounded inbox. Push-pull replies are sent back as
//! ordinary inbox messages instead of being awaited, so two nodes
//! gossiping with each other at the same time never wait on one
//! another.

use {
  crate::{
    report::Overlay,
    scenario::{Error, Faults, Scenario},
    wire,
  },
  bytes::Bytes,
  futures::future::join_all,
  metrics::increment_counter,
  parking_lot::RwLock,
  rand::{rngs::SmallRng, Rng, SeedableRng},
  sampler_view::{
    Addr,
    Buffer,
    Message,
    Mode,
    RandomSource,
    Randomness,
    Shared,
    View,
  },
  std::{collections::HashMap, sync::Arc},
  tokio::{
    sync::{
      mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
      oneshot,
    },
    task::JoinHandle,
  },
  tracing::{debug, warn},
};

/// Instructions accepted by a node task.
#[derive(Debug)]
pub enum Command {
  /// Start one gossip round.
  Tick,

  /// An encoded [`Message`] arrived from another node.
  Deliver(Bytes),

  /// Report the current view.
  Snapshot(oneshot::Sender<Buffer>),

  /// Acknowledge once every command queued before this one is done.
  Sync(oneshot::Sender<()>),
}

/// Inboxes of all live nodes. Removing an entry crashes that node.
type Directory = Arc<RwLock<HashMap<Addr, UnboundedSender<Command>>>>;

/// A population of node tasks.
pub struct Cluster {
  directory: Directory,
  tasks: Vec<JoinHandle<()>>,
  mortality: f64,
  rng: SmallRng,
}

impl Cluster {
  /// Spawns one task per node, each with its own random generator.
  ///
  /// Must be called from within a tokio runtime.
  pub fn spawn(scenario: &Scenario) -> Result<Self, Error> {
    Self::spawn_with(scenario, |config| Randomness::from(config.randomness))
  }

  /// Spawns one task per node, all drawing from one shared generator.
  pub fn spawn_shared(scenario: &Scenario) -> Result<Self, Error> {
    let mode = scenario.view_config(0).randomness;
    let shared = Shared::new(Randomness::from(mode));
    Self::spawn_with(scenario, move |_| shared.clone())
  }

  fn spawn_with<R, F>(scenario: &Scenario, mut rng: F) -> Result<Self, Error>
  where
    R: RandomSource + Send + 'static,
    F: FnMut(&sampler_view::Config) -> R,
  {
    scenario.validate()?;

    let directory: Directory = Arc::default();
    let mut inboxes = Vec::with_capacity(scenario.nodes);
    {
      let mut entries = directory.write();
      for i in 0..scenario.nodes {
        let (tx, rx) = unbounded_channel();
        entries.insert(Scenario::addr(i), tx);
        inboxes.push(rx);
      }
    }

    let mut tasks = Vec::with_capacity(scenario.nodes);
    for (i, inbox) in inboxes.into_iter().enumerate() {
      let config = scenario.view_config(i);
      let source = rng(&config);
      let addr = Scenario::addr(i);
      let view =
        View::with_random(addr, scenario.seed_of(i), config, source)?;
      tasks.push(tokio::spawn(node_loop(
        view,
        inbox,
        Arc::clone(&directory),
        scenario.mode,
        scenario.faults,
      )));
    }

    Ok(Self {
      directory,
      tasks,
      mortality: scenario.faults.mortality,
      rng: scenario.harness_rng(),
    })
  }

  pub fn len(&self) -> usize {
    self.directory.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.directory.read().is_empty()
  }

  /// Crashes a node. Its task ends once its inbox drains.
  pub fn kill(&self, addr: &Addr) -> bool {
    self.directory.write().remove(addr).is_some()
  }

  /// Ticks every live node once and waits until all resulting
  /// messages, replies included, have been processed.
  pub async fn round(&mut self) {
    for (addr, sender) in self.senders() {
      if self.mortality > 0.0 && self.rng.gen_bool(self.mortality) {
        debug!("{addr} crashed");
        self.kill(&addr);
        continue;
      }
      let _ = sender.send(Command::Tick);
    }

    // ticks, then requests, then replies
    for _ in 0..3 {
      self.settle().await;
    }
    increment_counter!("simulation_rounds");
  }

  pub async fn run(&mut self, rounds: usize) {
    for _ in 0..rounds {
      self.round().await;
    }
  }

  /// Current view of one live node.
  pub async fn peers(&self, addr: &Addr) -> Option<Buffer> {
    let sender = self.directory.read().get(addr).cloned()?;
    let (tx, rx) = oneshot::channel();
    sender.send(Command::Snapshot(tx)).ok()?;
    rx.await.ok()
  }

  /// Collects the views of all live nodes.
  pub async fn overlay(&self) -> Overlay {
    let pending: Vec<_> = self
      .senders()
      .into_iter()
      .filter_map(|(addr, sender)| {
        let (tx, rx) = oneshot::channel();
        sender.send(Command::Snapshot(tx)).ok()?;
        Some(async move { (addr, rx.await) })
      })
      .collect();

    let views: Vec<(Addr, Buffer)> = join_all(pending)
      .await
      .into_iter()
      .filter_map(|(addr, peers)| Some((addr, peers.ok()?)))
      .collect();

    Overlay::new(views.iter().map(|(addr, peers)| (addr, peers.as_slice())))
  }

  /// Stops all node tasks and waits for them to finish.
  pub async fn shutdown(self) {
    self.directory.write().clear();
    for task in self.tasks {
      if let Err(e) = task.await {
        warn!("node task failed: {e}");
      }
    }
  }

  fn senders(&self) -> Vec<(Addr, UnboundedSender<Command>)> {
    self
      .directory
      .read()
      .iter()
      .map(|(a, s)| (a.clone(), s.clone()))
      .collect()
  }

  async fn settle(&self) {
    let acks: Vec<_> = self
      .senders()
      .into_iter()
      .filter_map(|(_, sender)| {
        let (tx, rx) = oneshot::channel();
        sender.send(Command::Sync(tx)).ok().map(|_| rx)
      })
      .collect();
    join_all(acks).await;
  }
}

async fn node_loop<R: RandomSource>(
  mut view: View<R>,
  mut inbox: UnboundedReceiver<Command>,
  directory: Directory,
  mode: Mode,
  faults: Faults,
) {
  let mut rng = SmallRng::from_entropy();

  while let Some(command) = inbox.recv().await {
    match command {
      Command::Tick => match view.initiate(mode) {
        Ok((target, _)) if &target == view.addr() => {
          increment_counter!("gossip_rounds");
          increment_counter!("gossip_lost");
          debug!("{target}: round with itself dropped");
        }
        Ok((target, message)) => {
          increment_counter!("gossip_rounds");
          deliver(&directory, &target, &message, faults, &mut rng);
        }
        Err(e) => warn!("{}: cannot start a round: {e}", view.addr()),
      },
      Command::Deliver(bytes) => {
        let message = match wire::decode(&bytes) {
          Ok(message) => message,
          Err(e) => {
            warn!("{}: {e}", view.addr());
            continue;
          }
        };

        let sender = message.sender().cloned();
        match view.handle(message) {
          Ok(Some(reply)) => {
            if let Some(sender) = sender {
              deliver(&directory, &sender, &reply, faults, &mut rng);
            }
          }
          Ok(None) => {}
          Err(e) => warn!("{}: rejected message: {e}", view.addr()),
        }
      }
      Command::Snapshot(tx) => {
        let _ = tx.send(view.peers().to_vec());
      }
      Command::Sync(tx) => {
        let _ = tx.send(());
      }
    }
  }

  debug!("{}: stopped", view.addr());
}

fn deliver(
  directory: &Directory,
  to: &Addr,
  message: &Message,
  faults: Faults,
  rng: &mut SmallRng,
) {
  if faults.loss > 0.0 && rng.gen_bool(faults.loss) {
    debug!("message to {to} dropped");
    increment_counter!("gossip_lost");
    return;
  }

  let bytes = match wire::encode(message) {
    Ok(bytes) => bytes,
    Err(e) => {
      warn!("{e}");
      return;
    }
  };

  let inbox = directory.read().get(to).cloned();
  match inbox {
    Some(inbox) if inbox.send(Command::Deliver(bytes)).is_ok() => {}
    _ => {
      debug!("{to} is unreachable");
      increment_counter!("gossip_lost");
    }
  }
}

#[cfg(test)]
mod tests {
  use {
    super::Cluster,
    crate::{network::Network, scenario::Scenario},
    sampler_view::{Addr, Mode, PeerDescriptor},
  };

  fn scenario(nodes: usize) -> Scenario {
    Scenario {
      nodes,
      mode: Mode::PushPull,
      seed: Some(3),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn nodes_learn_about_each_other() -> anyhow::Result<()> {
    let mut cluster = Cluster::spawn(&scenario(40))?;
    cluster.run(15).await;

    let overlay = cluster.overlay().await;
    assert_eq!(overlay.len(), 40);
    let size = Scenario::default().view.size;
    assert!(overlay.out_degrees().max().unwrap() <= size);
    assert!(overlay.out_degrees().min().unwrap() > 1);

    cluster.shutdown().await;
    Ok(())
  }

  #[tokio::test]
  async fn rounds_with_itself_are_dropped() -> anyhow::Result<()> {
    let lonely = Scenario {
      nodes: 1,
      bootstrap: 1,
      ..scenario(1)
    };
    let n0 = Addr::from("n0");

    let mut cluster = Cluster::spawn(&lonely)?;
    cluster.run(3).await;
    let peers = cluster.peers(&n0).await;
    cluster.shutdown().await;

    let mut network = Network::boot(&lonely)?;
    let stats = network.run(3);
    assert_eq!(stats.lost, 3);

    let expected = vec![PeerDescriptor::new("n0", 3, 0, 1)];
    assert_eq!(peers, Some(expected.clone()));
    assert_eq!(network.get(&n0).map(|v| v.peers().to_vec()), Some(expected));
    Ok(())
  }

  #[tokio::test]
  async fn killed_nodes_drop_out() -> anyhow::Result<()> {
    let mut cluster = Cluster::spawn_shared(&scenario(10))?;
    assert!(cluster.kill(&Addr::from("n9")));
    assert!(!cluster.kill(&Addr::from("n9")));
    cluster.round().await;

    let overlay = cluster.overlay().await;
    assert_eq!(cluster.len(), 9);
    assert_eq!(overlay.len(), 9);
    assert!(overlay.neighbours(&"n9".into()).is_none());

    cluster.shutdown().await;
    Ok(())
  }
}
