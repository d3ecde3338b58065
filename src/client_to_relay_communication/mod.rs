//! The three types of `client -> relay` communications.
//!
//!  - `["EVENT", event_JSON]`: used to publish events
//!
//!  - `["REQ", subscription_id, filter_JSON...]`: used to request events and
//!    subscribe to new updates. A REQ message may contain multiple filters,
//!    one array slot per filter. Events that match any of the filters are to
//!    be returned, i.e., multiple filters are to be interpreted as `||`
//!    conditions.
//!
//!  - `["CLOSE", subscription_id]`: used to stop a previous subscription.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::event::Event;
use crate::filter::{Subscription, SubscriptionId};

/// A message this client can send to a relay, encoded as a tagged JSON
/// array whose first element is the literal tag string. A closed set:
/// anything else on the wire is not a client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
  /// `["EVENT", <event JSON>]` - publish an event.
  Event(Event),
  /// `["REQ", <subscription_id>, <filter JSON>...]` - open (or replace)
  /// a subscription. Filters follow the id positionally, not nested in
  /// a list.
  Req(Subscription),
  /// `["CLOSE", <subscription_id>]` - cancel a subscription.
  Close(SubscriptionId),
}

impl ClientMessage {
  /// Serialize as [`Value`]
  pub fn as_value(&self) -> Value {
    match self {
      Self::Event(event) => json!(["EVENT", event]),
      Self::Req(subscription) => {
        let mut elements = vec![json!("REQ"), json!(subscription.id)];
        elements.extend(subscription.filters.iter().map(|filter| json!(filter)));
        Value::Array(elements)
      }
      Self::Close(subscription_id) => json!(["CLOSE", subscription_id]),
    }
  }

  /// Get the communication as a JSON string, ready to be written to the
  /// wire as a text frame.
  pub fn as_json(&self) -> String {
    self.as_value().to_string()
  }
}

impl Serialize for ClientMessage {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    self.as_value().serialize(serializer)
  }
}
