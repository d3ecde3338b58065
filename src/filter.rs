use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::event::{id::EventId, kind::EventKind, PubKey, Timestamp};

/// Client-chosen opaque string, unique per active subscription on a
/// given connection.
pub type SubscriptionId = String;

///
/// Filters are data structures that clients send to relays (being the first
/// on the first connection) to request data from other clients.
/// The attributes of a Filter work as `&&` (in other words, all the
/// conditions set must be present in the event in order to pass the filter).
/// P.S.: a "REQ" communication from the client can have multiple filters.
/// In this case, all filters will be used as a `||` operator: anything that
/// matches any of the filters will be sent.
///
/// - ids: a list of event ids or prefixes
/// - authors: a list of pubkeys or prefixes, the pubkey of an event must be one of these
/// - kinds: a list of kind numbers
/// - tags: a map from a tag identifier to accepted values; each entry is
///   encoded as a top-level `#<id>` key (e.g. `#e`, `#p`) next to the
///   fixed keys, which is the shape relays expect
/// - since: a timestamp. Events must be newer than this to pass
/// - until: a timestamp. Events must be older than this to pass
/// - limit: maximum number of events to be returned in the initial query
///
/// Encode-only: absent fields are omitted entirely, never `null`.
///
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Filter {
  pub ids: Option<Vec<EventId>>,
  pub authors: Option<Vec<PubKey>>,
  pub kinds: Option<Vec<EventKind>>,
  pub tags: Option<BTreeMap<String, Vec<String>>>,
  pub since: Option<Timestamp>,
  pub until: Option<Timestamp>,
  pub limit: Option<u64>,
}

impl Serialize for Filter {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let mut map = serializer.serialize_map(None)?;
    if let Some(ids) = &self.ids {
      map.serialize_entry("ids", ids)?;
    }
    if let Some(authors) = &self.authors {
      map.serialize_entry("authors", authors)?;
    }
    if let Some(kinds) = &self.kinds {
      map.serialize_entry("kinds", kinds)?;
    }
    if let Some(since) = &self.since {
      map.serialize_entry("since", since)?;
    }
    if let Some(until) = &self.until {
      map.serialize_entry("until", until)?;
    }
    if let Some(limit) = &self.limit {
      map.serialize_entry("limit", limit)?;
    }
    if let Some(tags) = &self.tags {
      for (id, values) in tags {
        map.serialize_entry(&format!("#{id}"), values)?;
      }
    }
    map.end()
  }
}

impl Filter {
  /// Serialize as [`Value`]
  pub fn as_value(&self) -> Value {
    json!(self)
  }

  /// Get [`Filter`] in JSON string
  pub fn as_json(&self) -> String {
    self.as_value().to_string()
  }
}

///
/// A subscription id paired with one or more filters. Sent to a relay it
/// opens (or replaces) a stream of matching stored and live events, which
/// stays active until an explicit `CLOSE` or the connection drops.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
  pub id: SubscriptionId,
  pub filters: Vec<Filter>,
}

impl Subscription {
  /// A subscription with a random (uuid v4) id.
  pub fn new(filters: Vec<Filter>) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      filters,
    }
  }

  /// A subscription with a caller-chosen id. Reusing the id of an active
  /// subscription on the same connection replaces it relay-side.
  pub fn with_id<S: Into<SubscriptionId>>(id: S, filters: Vec<Filter>) -> Self {
    Self {
      id: id.into(),
      filters,
    }
  }
}
