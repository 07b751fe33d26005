//! Encoding of gossip messages for the simulated wire.
//!
//! Every message crossing a node boundary is serialized with
//! MessagePack, so nodes only ever share copied bytes.

use {bytes::Bytes, sampler_view::Message, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to encode message: {0}")]
  Encode(#[from] rmp_serde::encode::Error),

  #[error("failed to decode message: {0}")]
  Decode(#[from] rmp_serde::decode::Error),
}

pub fn encode(message: &Message) -> Result<Bytes, Error> {
  Ok(rmp_serde::to_vec(message)?.into())
}

pub fn decode(bytes: &[u8]) -> Result<Message, Error> {
  Ok(rmp_serde::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
  use {
    super::{decode, encode, Error},
    sampler_view::{Message, PeerDescriptor},
  };

  #[test]
  fn messages_survive_the_wire() -> anyhow::Result<()> {
    let message = Message::PushPull(vec![
      PeerDescriptor::new("n1", 0, 3, 10),
      PeerDescriptor::new("10.0.0.7:4000", 17, 0, 2),
    ]);
    let bytes = encode(&message)?;
    assert_eq!(decode(&bytes)?, message);
    Ok(())
  }

  #[test]
  fn garbage_is_rejected() {
    assert!(matches!(decode(&[0xc1, 0x00, 0x13]), Err(Error::Decode(_))));
  }
}
