use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

///
/// A tag is an ordered, non-empty list of strings attached to an event.
/// The first element identifies the tag (`"e"` references another event,
/// `"p"` references a pubkey); the rest is positional free-form data.
///
/// Tags are part of the signed payload, so their array shape must be
/// preserved byte-for-byte through decode and re-encode.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag(Vec<String>);

impl Tag {
  /// Builds a tag from its identifier and the remaining positional data.
  /// Non-empty by construction.
  pub fn new<S: Into<String>>(id: S, other_information: Vec<String>) -> Self {
    let mut underlying_data = vec![id.into()];
    underlying_data.extend(other_information);
    Self(underlying_data)
  }

  /// An `"e"` tag referencing another event, optionally carrying a relay
  /// URL where that event can be found.
  pub fn event<S: Into<String>>(other_event_id: S, recommended_relay: Option<String>) -> Self {
    let mut other_information = vec![other_event_id.into()];
    other_information.extend(recommended_relay);
    Self::new("e", other_information)
  }

  /// A `"p"` tag referencing a pubkey, optionally carrying a relay URL.
  pub fn pub_key<S: Into<String>>(pubkey: S, recommended_relay: Option<String>) -> Self {
    let mut other_information = vec![pubkey.into()];
    other_information.extend(recommended_relay);
    Self::new("p", other_information)
  }

  /// The tag identifier (element 0).
  pub fn id(&self) -> &str {
    &self.0[0]
  }

  /// Everything after the identifier.
  pub fn other_information(&self) -> &[String] {
    &self.0[1..]
  }

  pub fn as_vec(&self) -> &[String] {
    &self.0
  }
}

impl Serialize for Tag {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    self.0.serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for Tag {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let underlying_data = Vec::<String>::deserialize(deserializer)?;
    if underlying_data.is_empty() {
      return Err(de::Error::invalid_length(
        0,
        &"a tag identifier followed by optional data",
      ));
    }
    Ok(Self(underlying_data))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  #[test]
  fn deserializing_an_empty_array_fails() {
    assert!(serde_json::from_str::<Tag>("[]").is_err());
  }

  #[test]
  fn deserializing_splits_id_and_other_information() {
    let tag: Tag = serde_json::from_str(r#"["e","abc"]"#).unwrap();
    assert_eq!(tag.id(), "e");
    assert_eq!(tag.other_information(), ["abc".to_string()]);
  }

  #[test]
  fn serializes_as_a_flat_string_array() {
    let tag = Tag::event(
      "688787d8ff144c502c7f5cffaafe2cc588d86079f9de88304c26b0cb99ce91c6",
      Some("wss://relay.damus.io".to_string()),
    );
    assert_eq!(
      serde_json::to_string(&tag).unwrap(),
      r#"["e","688787d8ff144c502c7f5cffaafe2cc588d86079f9de88304c26b0cb99ce91c6","wss://relay.damus.io"]"#
    );

    let tag: Tag = serde_json::from_str(&serde_json::to_string(&tag).unwrap()).unwrap();
    assert_eq!(tag.id(), "e");
    assert_eq!(tag.other_information().len(), 2);
  }

  #[test]
  fn constructors_omit_an_absent_relay_url() {
    let tag = Tag::pub_key(
      "02c7e1b1e9c175ab2d100baf1d5a66e73ecc044e9f8093d0c965741f26aa3abf76",
      None,
    );
    assert_eq!(
      serde_json::to_string(&tag).unwrap(),
      r#"["p","02c7e1b1e9c175ab2d100baf1d5a66e73ecc044e9f8093d0c965741f26aa3abf76"]"#
    );
  }

  #[test]
  fn free_form_tags_keep_their_order() {
    let tag = Tag::new("t", vec!["nostr".to_string(), "rust".to_string()]);
    assert_eq!(tag.as_vec(), ["t", "nostr", "rust"]);
  }
}
