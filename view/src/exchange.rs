//! Push and push-pull gossip rounds on top of [`View`].
//!
//! The view never talks to the network itself. An exchange is split
//! into the initiator side ([`View::initiate`]) and the responder side
//! ([`View::handle`]) so that any transport can carry the messages in
//! between, and [`View::gossip`] glues both ends together for
//! transports that deliver synchronously.

use {
  crate::{
    descriptor::{Addr, Buffer},
    random::RandomSource,
    view::{Error, View},
  },
  metrics::increment_counter,
  serde::{Deserialize, Serialize},
  tracing::debug,
};

/// Flavour of a gossip round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
  /// Initiator pushes, target merges, no reply.
  Push,

  /// Target additionally replies with a push of its own which the
  /// initiator merges. Converges in fewer rounds for about twice the
  /// bandwidth.
  #[default]
  PushPull,
}

/// Envelope carried by the transport between two views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
  /// A push that expects no answer.
  Push(Buffer),

  /// A push that asks the receiver for a [`Message::Reply`].
  PushPull(Buffer),

  /// Answer to a [`Message::PushPull`].
  Reply(Buffer),
}

impl Message {
  pub fn new(mode: Mode, buffer: Buffer) -> Self {
    match mode {
      Mode::Push => Message::Push(buffer),
      Mode::PushPull => Message::PushPull(buffer),
    }
  }

  pub fn buffer(&self) -> &Buffer {
    match self {
      Message::Push(b) | Message::PushPull(b) | Message::Reply(b) => b,
    }
  }

  /// Node that produced the message, the owner of the first descriptor.
  pub fn sender(&self) -> Option<&Addr> {
    self.buffer().first().map(|d| &d.addr)
  }
}

/// Capability to hand a message to another node.
///
/// Delivery may fail, be delayed or silently drop the message. A
/// synchronous transport returns the answer to a
/// [`Message::PushPull`] directly, an asynchronous one returns
/// `Ok(None)` and routes the reply back through [`View::handle`].
pub trait Transport {
  type Error: std::error::Error;

  fn send(
    &mut self,
    to: &Addr,
    message: Message,
  ) -> Result<Option<Message>, Self::Error>;
}

/// What happened to a gossip round started by [`View::gossip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// The push was handed to the transport, no reply is expected or it
  /// will arrive later.
  Pushed,

  /// The target replied and its buffer has been merged.
  Exchanged { received: usize },

  /// The transport could not deliver the message or lost the reply.
  Lost,
}

impl<R: RandomSource> View<R> {
  /// Starts a gossip round: picks the target and builds the message
  /// addressed to it.
  pub fn initiate(&mut self, mode: Mode) -> Result<(Addr, Message), Error> {
    let target = self.select_peer()?.addr;
    let buffer = self.push(&target)?;
    Ok((target, Message::new(mode, buffer)))
  }

  /// Responder side of an exchange.
  ///
  /// A push-pull request is answered with a sample of this view taken
  /// before the request is merged, the returned message must be sent
  /// back to the request's sender.
  pub fn handle(&mut self, message: Message) -> Result<Option<Message>, Error> {
    match message {
      Message::Push(buffer) => {
        self.receive(buffer)?;
        Ok(None)
      }
      Message::PushPull(buffer) => {
        let sender = buffer
          .first()
          .map(|d| d.addr.clone())
          .ok_or(Error::MalformedBuffer)?;
        let reply = self.push(&sender)?;
        self.receive(buffer)?;
        Ok(Some(Message::Reply(reply)))
      }
      Message::Reply(buffer) => {
        self.select(buffer);
        Ok(None)
      }
    }
  }

  /// Runs one full gossip round over `transport`.
  ///
  /// Delivery failures are part of normal operation and are reported as
  /// [`Outcome::Lost`], the round is never retried.
  pub fn gossip<T: Transport>(
    &mut self,
    mode: Mode,
    transport: &mut T,
  ) -> Result<Outcome, Error> {
    let (target, message) = self.initiate(mode)?;
    increment_counter!("gossip_rounds");

    match transport.send(&target, message) {
      Ok(Some(reply)) => {
        let received = reply.buffer().len();
        self.handle(reply)?;
        increment_counter!("gossip_exchanges");
        Ok(Outcome::Exchanged { received })
      }
      Ok(None) if mode == Mode::PushPull => {
        increment_counter!("gossip_lost");
        Ok(Outcome::Lost)
      }
      Ok(None) => Ok(Outcome::Pushed),
      Err(e) => {
        debug!("{}: gossip to {target} lost: {e}", self.addr());
        increment_counter!("gossip_lost");
        Ok(Outcome::Lost)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{Message, Mode, Outcome, Transport},
    crate::{Addr, Config, Error, PeerDescriptor, Randomness, Sequence, View},
    std::collections::HashMap,
  };

  /// Delivers synchronously to views owned by the test.
  struct Direct<'a> {
    views: HashMap<Addr, &'a mut View<Sequence>>,
  }

  #[derive(Debug, thiserror::Error)]
  #[error("unreachable")]
  struct Unreachable;

  impl<'a> Transport for Direct<'a> {
    type Error = Unreachable;

    fn send(
      &mut self,
      to: &Addr,
      message: Message,
    ) -> Result<Option<Message>, Self::Error> {
      let view = self.views.get_mut(to).ok_or(Unreachable)?;
      view.handle(message).map_err(|_| Unreachable)
    }
  }

  fn node(addr: &str, seed: &str) -> View<Sequence> {
    View::with_random(addr, seed, Config::default(), Sequence::highest())
      .unwrap()
  }

  #[test]
  fn push_pull_responder_learns_initiator() -> anyhow::Result<()> {
    let mut n0 = node("n0", "n0");
    let mut n1 = node("n1", "n0");
    assert_eq!(n1.peers(), &[PeerDescriptor::new("n0", 0, 0, 1)]);

    let outcome = {
      let mut transport = Direct {
        views: [(Addr::from("n0"), &mut n0)].into_iter().collect(),
      };
      n1.gossip(Mode::PushPull, &mut transport)?
    };
    assert_eq!(outcome, Outcome::Exchanged { received: 2 });

    // the responder holds both nodes, its old entry aged by the reply
    assert_eq!(n0.peers(), &[
      PeerDescriptor::new("n0", 1, 0, 1),
      PeerDescriptor::new("n1", 0, 0, 1),
    ]);
    assert_eq!(n0.in_degree().estimate(), 1);

    // the initiator never learns about itself, its seed is refreshed
    assert_eq!(n1.peers(), &[PeerDescriptor::new("n0", 0, 0, 1)]);
    Ok(())
  }

  #[test]
  fn pushed_node_lands_beside_receiver_seed() -> anyhow::Result<()> {
    let mut n0 = node("n0", "n0");
    let mut n1 = node("n1", "n1");
    assert_eq!(n1.peers(), &[PeerDescriptor::new("n1", 0, 0, 1)]);

    let b = n0.push(&"n1".into())?;
    n1.select(b);

    assert_eq!(n1.peers(), &[
      PeerDescriptor::new("n1", 0, 0, 1),
      PeerDescriptor::new("n0", 0, 0, 1),
    ]);
    assert_eq!(n0.peers(), &[PeerDescriptor::new("n0", 1, 0, 1)]);

    // a round later both entries have aged once
    n1.increase_age();
    assert!(n1.peers().iter().all(|d| d.age == 1));
    Ok(())
  }

  #[test]
  fn push_only_gets_no_reply() -> anyhow::Result<()> {
    let mut n0 = node("n0", "n0");
    let mut n1 = node("n1", "n0");
    {
      let mut transport = Direct {
        views: [(Addr::from("n0"), &mut n0)].into_iter().collect(),
      };
      assert_eq!(n1.gossip(Mode::Push, &mut transport)?, Outcome::Pushed);
    }
    assert!(n0.contains(&"n1".into()));
    assert_eq!(n1.len(), 1);
    Ok(())
  }

  #[test]
  fn unreachable_targets_are_not_errors() -> anyhow::Result<()> {
    let mut n1 = View::new("n1", "gone", Config {
      randomness: crate::RandomnessMode::Fast { seed: 1 },
      ..Default::default()
    })?;
    let mut transport = Direct {
      views: HashMap::new(),
    };
    assert_eq!(n1.gossip(Mode::PushPull, &mut transport)?, Outcome::Lost);

    // the round still happened locally
    assert_eq!(n1.peers()[0].age, 1);
    Ok(())
  }

  #[test]
  fn empty_push_pull_is_malformed() -> anyhow::Result<()> {
    let mut n0 = View::with_random(
      "n0",
      "n1",
      Config::default(),
      Randomness::fast(1),
    )?;
    assert_eq!(
      n0.handle(Message::PushPull(vec![])),
      Err(Error::MalformedBuffer)
    );
    assert_eq!(n0.handle(Message::Push(vec![])), Err(Error::MalformedBuffer));
    assert_eq!(n0.peers()[0].age, 0);
    Ok(())
  }

  #[test]
  fn replies_are_merged_without_credit() -> anyhow::Result<()> {
    let mut n0 = node("n0", "n1");
    let reply = Message::Reply(vec![PeerDescriptor::new("n2", 0, 0, 3)]);
    assert_eq!(reply.sender(), Some(&Addr::from("n2")));
    assert_eq!(n0.handle(reply)?, None);
    assert!(n0.contains(&"n2".into()));
    assert_eq!(n0.in_degree().estimate(), 0);
    Ok(())
  }
}
