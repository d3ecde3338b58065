use bitcoin_hashes::{sha256, Hash};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{kind::EventKind, tag::Tag, Error, PubKey, Timestamp};

///
/// Serializes the signable fields of an event into their canonical bytes:
/// the JSON array `[0,<pubkey>,<created_at>,<kind>,<tags>,<content>]` with
/// no whitespace between tokens and no escaping of forward slashes. The
/// leading `0` is a fixed placeholder required by the protocol.
///
/// These bytes feed the SHA256 that becomes the event id, which is also
/// the message the Schnorr signature commits to. Any deviation here (key
/// ordering, escaping, numeric formatting) silently changes every id and
/// breaks signature verification, which is why this is the only encoding
/// of an event that is specified byte-for-byte.
///
pub(crate) fn serialize_event_data(
  pubkey: &PubKey,
  created_at: Timestamp,
  kind: EventKind,
  tags: &[Tag],
  content: &str,
) -> Result<Vec<u8>, Error> {
  serde_json::to_vec(&json!([0, pubkey, created_at, kind, tags, content]))
    .map_err(Error::EncodingFailed)
}

/// 32-byte lowercase hex-encoded SHA256 of the serialized event data.
/// This equals `event.id`.
///
/// <https://github.com/nostr-protocol/nips/blob/master/01.md>
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct EventId(pub String);

impl EventId {
  pub(crate) fn new(
    pubkey: &PubKey,
    created_at: Timestamp,
    kind: EventKind,
    tags: &[Tag],
    content: &str,
  ) -> Result<Self, Error> {
    let data = serialize_event_data(pubkey, created_at, kind, tags, content)?;
    Ok(Self(sha256::Hash::hash(&data).to_string()))
  }
}
