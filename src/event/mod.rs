use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use secp256k1::{schnorr, Secp256k1, Signing, Verification};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// Event Modules
pub mod id;
pub mod kind;
pub mod tag;

use self::id::EventId;
use self::kind::EventKind;
use self::tag::Tag;

use crate::keys::Keys;
use crate::schnorr::{sign_schnorr, verify_schnorr};

pub type PubKey = String;
pub type Timestamp = u64;

/// [`Event`] error
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// Canonical serialization of the signable fields failed
  #[error("event encoding failed: {0}")]
  EncodingFailed(#[source] serde_json::Error),
  /// Key mismatch, a primitive failure, or a fresh signature that did
  /// not pass self-verification
  #[error("event signing failed")]
  SigningFailed,
  /// Error serializing or deserializing JSON data
  #[error(transparent)]
  Json(#[from] serde_json::Error),
  #[error("Invalid data")]
  InvalidData,
}

///
/// Event is the only object that exists in the Nostr protocol.
///
/// Example (id's and other hashes are not valid for the information presented):
///   ```json
///   {
///     "id": "ca978112ca1bbdcafac231b39a23dc4da786eff8147c4e72b9807785afee48bb",
///     "pubkey": "614a695bab54e8dc98946abdb8ec019599ece6dada0c23890977d0fa128081d6",
///     "created_at": 1673002822,
///     "kind": 1,
///     "tags": [
///       ["e", "688787d8ff144c502c7f5cffaafe2cc588d86079f9de88304c26b0cb99ce91c6", "wss://relay.damus.io"],
///       ["p", "02c7e1b1e9c175ab2d100baf1d5a66e73ecc044e9f8093d0c965741f26aa3abf76"],
///     ],
///     "content": "Lorem ipsum dolor sit amet",
///     "sig": "e8551d85f530113366e8da481354c2756605e3f58149cedc1fb9385d35251712b954af8ef891cb0467d50ddc6685063d4190c97e9e131f903e6e4176dc13ce7c"
///   }
///   ```
///
/// An event built with [`Event::new`] holds `id == sha256(canonical bytes)`
/// and a signature that verifies by construction. An event deserialized
/// from the wire guarantees neither: run [`Event::verified`] before
/// trusting it.
///
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Event {
  /// 32-bytes SHA256 of the serialized event data
  pub id: String,
  /// 32-bytes hex-encoded x-only public key of the event creator
  pub pubkey: PubKey,
  /// Unix timestamp in seconds
  pub created_at: Timestamp,
  /// Kind of event
  pub kind: EventKind,
  /// An array of arrays with more info about the event,
  /// like, for example, if it is replying to someone.
  pub tags: Vec<Tag>,
  /// Arbitrary string. Meaning depends on the kind of the event.
  pub content: String,
  /// 64-bytes hex signature of the id field
  pub sig: String,
}

impl Event {
  /// Creates and signs a fresh event authored by `keys`, stamped with the
  /// current time. The id is computed from the canonical bytes, signed,
  /// and the fresh signature is verified before the event is returned.
  pub fn new(
    keys: &Keys,
    kind: EventKind,
    tags: Vec<Tag>,
    content: String,
  ) -> Result<Self, Error> {
    let pubkey = keys.public_key_hex();
    let created_at = unix_timestamp();
    let id = EventId::new(&pubkey, created_at, kind, &tags, &content)?.0;
    let sig = sign_id(keys, &id, &pubkey)?;

    Ok(Self {
      id,
      pubkey,
      created_at,
      kind,
      tags,
      content,
      sig,
    })
  }

  /// Signs an externally-specified event: every identity field, including
  /// the id, is supplied by the caller. The supplied pubkey must be the
  /// keypair's own (otherwise `SigningFailed`).
  ///
  /// Caveat: the supplied id is signed as-is and NOT recomputed from the
  /// other fields, so a caller passing a mismatched id gets an event that
  /// fails [`Event::verified`]. This is intentional, to allow co-signing
  /// an id computed elsewhere.
  pub fn new_signed(
    keys: &Keys,
    id: String,
    pubkey: PubKey,
    created_at: Timestamp,
    kind: EventKind,
    tags: Vec<Tag>,
    content: String,
  ) -> Result<Self, Error> {
    if pubkey != keys.public_key_hex() {
      return Err(Error::SigningFailed);
    }
    let sig = sign_id(keys, &id, &pubkey)?;

    Ok(Self {
      id,
      pubkey,
      created_at,
      kind,
      tags,
      content,
      sig,
    })
  }

  /// The sole trust gate for events received from a relay: recomputes the
  /// canonical bytes and id from this event's own fields, compares with
  /// the stored id, then checks the Schnorr signature under the stored
  /// pubkey. Returns `false` (never errors) on any mismatch, malformed
  /// hex, or primitive failure.
  pub fn verified(&self) -> bool {
    let id = match EventId::new(
      &self.pubkey,
      self.created_at,
      self.kind,
      &self.tags,
      &self.content,
    ) {
      Ok(id) => id,
      Err(_) => return false,
    };
    if id.0 != self.id {
      return false;
    }

    let sig = match schnorr::Signature::from_str(&self.sig) {
      Ok(signature) => signature,
      Err(_) => return false,
    };

    let secp = Secp256k1::verification_only();
    verify_schnorr(&secp, &self.id, &sig, &self.pubkey)
  }

  /// Deserializes from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self, Error> {
    serde_json::from_value(msg).map_err(Error::Json)
  }

  /// Serialize as [`Value`]
  pub fn as_value(&self) -> Value {
    json!(self)
  }

  /// Deserialize [`Event`] from JSON string
  pub fn from_json<S>(msg: S) -> Result<Self, Error>
  where
    S: Into<String>,
  {
    let msg: &str = &msg.into();

    if msg.is_empty() {
      return Err(Error::InvalidData);
    }

    let value: Value = serde_json::from_str(msg)?;
    Self::from_value(value)
  }

  /// Get [`Event`] in JSON string. Serializes the struct directly so the
  /// fields keep their declaration order on the wire; `as_value` goes
  /// through a [`Value`] map, which does not.
  pub fn as_json(&self) -> String {
    serde_json::to_string(self).unwrap()
  }
}

/// Signs `id` and verifies the fresh signature against `pubkey` before
/// returning it. A signature the keypair's own public key cannot verify
/// is reported as [`Error::SigningFailed`], never handed back.
fn sign_id(keys: &Keys, id: &str, pubkey: &str) -> Result<String, Error> {
  let secp = Secp256k1::new();
  let sig = sign_and_check(&secp, keys, id, pubkey)?;
  Ok(sig.to_string())
}

fn sign_and_check<C: Signing + Verification>(
  secp: &Secp256k1<C>,
  keys: &Keys,
  id: &str,
  pubkey: &str,
) -> Result<schnorr::Signature, Error> {
  let sig = sign_schnorr(secp, id, keys.secret_key()).map_err(|err| {
    log::error!("[sign_and_check] {err}");
    Error::SigningFailed
  })?;
  if !verify_schnorr(secp, id, &sig, pubkey) {
    return Err(Error::SigningFailed);
  }
  Ok(sig)
}

fn unix_timestamp() -> Timestamp {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .expect("Time went backwards")
    .as_secs()
}
