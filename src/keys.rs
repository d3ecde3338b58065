use std::str::FromStr;

use bech32::{FromBase32, ToBase32, Variant};
use bitcoin_hashes::hex::ToHex;
use secp256k1::{Secp256k1, SecretKey, Signing, XOnlyPublicKey};

/// Human-readable prefix of a bech32-encoded secret key.
pub const SECRET_KEY_HRP: &str = "nsec";
/// Human-readable prefix of a bech32-encoded public key.
pub const PUBLIC_KEY_HRP: &str = "npub";

/// [`Keys`] error
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// Error secp256k1
  #[error(transparent)]
  SECP256K1(#[from] secp256k1::Error),

  /// Error encoding or decoding bech32 data
  #[error(transparent)]
  Bech32(#[from] bech32::Error),

  /// The bech32 string carried a prefix other than the expected one
  #[error("unexpected bech32 prefix: {0}")]
  WrongPrefix(String),
}

///
/// A secp256k1 keypair: the private scalar and its derived x-only
/// public key. The private scalar is owned exclusively by this value
/// and only leaves it through an explicit `sign`/`shared_secret` call.
///
/// Besides raw hex, both halves have a bech32 text form (`nsec...` for
/// the secret key, `npub...` for the public key). Those are pure
/// re-encodings of the same 32 bytes, not separate identities.
///
#[derive(Debug, Clone)]
pub struct Keys {
  secret_key: SecretKey,
  public_key: XOnlyPublicKey,
}

impl Keys {
  /// Generates a fresh random keypair.
  pub fn generate() -> Self {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::new(&mut rand::thread_rng());
    Self::from_secret_key(&secp, secret_key)
  }

  /// Builds a keypair from a hex-encoded 32-byte secret key.
  pub fn parse(secret_key_hex: &str) -> Result<Self, Error> {
    let secret_key = SecretKey::from_str(secret_key_hex)?;
    Ok(Self::from_secret_key(&Secp256k1::new(), secret_key))
  }

  /// Builds a keypair from a bech32 `nsec...` secret key.
  pub fn from_bech32(bech32_secret_key: &str) -> Result<Self, Error> {
    let (hrp, data, _variant) = bech32::decode(bech32_secret_key)?;
    if hrp != SECRET_KEY_HRP {
      return Err(Error::WrongPrefix(hrp));
    }
    let bytes = Vec::<u8>::from_base32(&data)?;
    let secret_key = SecretKey::from_slice(&bytes)?;
    Ok(Self::from_secret_key(&Secp256k1::new(), secret_key))
  }

  fn from_secret_key<C: Signing>(secp: &Secp256k1<C>, secret_key: SecretKey) -> Self {
    let keypair = secp256k1::KeyPair::from_secret_key(secp, &secret_key);
    let (public_key, _parity) = XOnlyPublicKey::from_keypair(&keypair);
    Self {
      secret_key,
      public_key,
    }
  }

  pub fn public_key(&self) -> XOnlyPublicKey {
    self.public_key
  }

  /// 32-byte x-only public key, lowercase hex. This is the `pubkey`
  /// field of every event this keypair authors.
  pub fn public_key_hex(&self) -> String {
    self.public_key.to_string()
  }

  pub fn secret_key_hex(&self) -> String {
    self.secret_key.secret_bytes().to_hex()
  }

  pub fn bech32_public_key(&self) -> Result<String, Error> {
    Ok(bech32::encode(
      PUBLIC_KEY_HRP,
      self.public_key.serialize().to_base32(),
      Variant::Bech32,
    )?)
  }

  pub fn bech32_secret_key(&self) -> Result<String, Error> {
    Ok(bech32::encode(
      SECRET_KEY_HRP,
      self.secret_key.secret_bytes().to_base32(),
      Variant::Bech32,
    )?)
  }

  pub(crate) fn secret_key(&self) -> &SecretKey {
    &self.secret_key
  }
}
