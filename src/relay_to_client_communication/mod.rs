//! The four types of `relay -> client` communications.
//!
//!  - `["EVENT", subscription_id, event_JSON]`: an event matching one of
//!    the subscription's filters
//!
//!  - `["EOSE", subscription_id]`: end of the stored-event backlog for this
//!    subscription; live events may still follow
//!
//!  - `["OK", event_id, accepted, message]`: acknowledgement or rejection
//!    of a published event
//!
//!  - `["NOTICE", message]`: informational or error text from the relay

use serde_json::Value;

use crate::event::Event;
use crate::filter::SubscriptionId;

/// [`RelayMessage`] error
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// The frame is not the shape of any known relay message: unknown tag,
  /// wrong arity, or a type mismatch in some position
  #[error("malformed relay message")]
  MalformedMessage,
}

/// A message a relay can send to this client, decoded from an inbound
/// text frame by dispatching strictly on the first array element.
///
/// Decoding is total and side-effect free. In particular it does NOT run
/// [`Event::verified`] on embedded events: a relay can replay or forge
/// any `EVENT` payload, so the caller must gate on `verified()` before
/// trusting one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
  /// `["EVENT", <subscription_id>, <event JSON>]`
  Event {
    subscription_id: SubscriptionId,
    event: Event,
  },
  /// `["EOSE", <subscription_id>]`
  EndOfStoredEvents(SubscriptionId),
  /// `["OK", <event_id>, <accepted>, <message>]`
  Ok {
    event_id: String,
    accepted: bool,
    message: String,
  },
  /// `["NOTICE", <message>]`
  Notice(String),
}

impl RelayMessage {
  /// Deserialize [`RelayMessage`] from a JSON string. Never partially
  /// decodes: anything short of an exact match is [`Error::MalformedMessage`].
  pub fn from_json(msg: &str) -> Result<Self, Error> {
    let value: Value = serde_json::from_str(msg).map_err(|_| Error::MalformedMessage)?;
    Self::from_value(value)
  }

  /// Deserialize from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self, Error> {
    let v = msg.as_array().ok_or(Error::MalformedMessage)?;

    if v.is_empty() {
      return Err(Error::MalformedMessage);
    }

    let tag = v[0].as_str().ok_or(Error::MalformedMessage)?;

    match tag {
      // ["EVENT", <subscription_id>, <event JSON>]
      "EVENT" => {
        if v.len() != 3 {
          return Err(Error::MalformedMessage);
        }
        let subscription_id = as_string(&v[1])?;
        let event: Event =
          serde_json::from_value(v[2].clone()).map_err(|_| Error::MalformedMessage)?;
        Ok(Self::Event {
          subscription_id,
          event,
        })
      }
      // ["EOSE", <subscription_id>]
      "EOSE" => {
        if v.len() != 2 {
          return Err(Error::MalformedMessage);
        }
        Ok(Self::EndOfStoredEvents(as_string(&v[1])?))
      }
      // ["OK", <event_id>, <accepted>, <message>]
      "OK" => {
        if v.len() != 4 {
          return Err(Error::MalformedMessage);
        }
        let event_id = as_string(&v[1])?;
        let accepted = v[2].as_bool().ok_or(Error::MalformedMessage)?;
        let message = as_string(&v[3])?;
        Ok(Self::Ok {
          event_id,
          accepted,
          message,
        })
      }
      // ["NOTICE", <message>]
      "NOTICE" => {
        if v.len() != 2 {
          return Err(Error::MalformedMessage);
        }
        Ok(Self::Notice(as_string(&v[1])?))
      }
      _ => Err(Error::MalformedMessage),
    }
  }
}

fn as_string(value: &Value) -> Result<String, Error> {
  value
    .as_str()
    .map(ToString::to_string)
    .ok_or(Error::MalformedMessage)
}
