use serde::de::{Deserialize, Deserializer, Error, Visitor};
use serde::ser::{Serialize, Serializer};
use std::fmt;

/// Defines the type of the event.
/// Different types will change the meaning of different keys
/// of the event object.
/// `Text` is the default.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum EventKind {
  /// The content is set to a stringified JSON object
  /// `{name: <username>, about: <string>, picture: <url, string>}`
  /// describing the user who created the event.
  /// A relay may delete past `Metadata` events once it gets a new one
  /// from the same pubkey.
  Metadata,
  /// The content is set to the plaintext content of a note
  /// (anything the user wants to say). Markdown links (`[]()` stuff)
  /// are not plaintext.
  #[default]
  Text,
  /// The content is set to the URL (e.g.: `wss://somerelay.com`) of a relay
  /// the event creator wants to recommend to its followers.
  RecommendRelay,
  /// The content is an encrypted direct message
  /// (see [`crate::dm`] for the cipher).
  EncryptedDirectMessage,
  /// Any other kind number. Round-trips losslessly so unknown kinds
  /// survive decode and re-encode untouched.
  Custom(u64),
}

impl From<u64> for EventKind {
  fn from(u: u64) -> Self {
    match u {
      0 => Self::Metadata,
      1 => Self::Text,
      2 => Self::RecommendRelay,
      4 => Self::EncryptedDirectMessage,
      x => Self::Custom(x),
    }
  }
}

impl From<EventKind> for u64 {
  fn from(e: EventKind) -> u64 {
    match e {
      EventKind::Metadata => 0,
      EventKind::Text => 1,
      EventKind::RecommendRelay => 2,
      EventKind::EncryptedDirectMessage => 4,
      EventKind::Custom(u) => u,
    }
  }
}

impl Serialize for EventKind {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_u64(From::from(*self))
  }
}

struct EventKindVisitor;

impl Visitor<'_> for EventKindVisitor {
  type Value = EventKind;

  fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "an unsigned number of maximum length of 64 bits")
  }

  fn visit_u64<E>(self, v: u64) -> Result<EventKind, E>
  where
    E: Error,
  {
    Ok(From::<u64>::from(v))
  }
}

impl<'de> Deserialize<'de> for EventKind {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    deserializer.deserialize_u64(EventKindVisitor)
  }
}
