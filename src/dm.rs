use std::str::FromStr;

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use secp256k1::{ecdh, PublicKey, SecretKey, XOnlyPublicKey};

use crate::keys::Keys;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// [`Dm`] error
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// Error secp256k1
  #[error(transparent)]
  SECP256K1(#[from] secp256k1::Error),
}

///
/// ECDH shared secret between our private scalar and a peer's x-only
/// public key: the x coordinate of the resulting curve point, raw.
///
/// This deliberately skips the hashing a generic ECDH applies to the
/// point - the direct-message ecosystem keys AES with the bare x
/// coordinate, and both sides must derive the identical 32 bytes.
///
pub fn shared_secret(
  secret_key: &SecretKey,
  peer_pubkey: &XOnlyPublicKey,
) -> Result<[u8; 32], Error> {
  // lift the x-only key to a full point; the parity choice does not
  // matter because negating a point leaves its x coordinate unchanged
  let mut compressed = [0u8; 33];
  compressed[0] = 0x02;
  compressed[1..].copy_from_slice(&peer_pubkey.serialize());
  let point = PublicKey::from_slice(&compressed)?;

  let shared_point = ecdh::shared_secret_point(&point, secret_key);
  let mut secret = [0u8; 32];
  secret.copy_from_slice(&shared_point[..32]);
  Ok(secret)
}

/// Encrypts `plaintext` with AES-256-CBC under `shared_secret`, using a
/// fresh random 16-byte IV. The IV is never reused across calls: CBC
/// leaks plaintext relationships under a repeated IV.
///
/// Wire form: `base64(ciphertext) + "?iv=" + base64(iv)`.
pub fn encrypt(plaintext: &[u8], shared_secret: &[u8; 32]) -> String {
  let mut iv = [0u8; 16];
  rand::thread_rng().fill_bytes(&mut iv);

  let ciphertext =
    Aes256CbcEnc::new(shared_secret.into(), (&iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

  format!("{}?iv={}", STANDARD.encode(ciphertext), STANDARD.encode(iv))
}

/// Reverses [`encrypt`]. `None` on a missing `?iv=` separator, bad
/// base64 on either side, a wrong IV length, or a cipher/padding
/// failure - attacker-reachable input never panics or errors.
pub fn decrypt(payload: &str, shared_secret: &[u8; 32]) -> Option<Vec<u8>> {
  let (ciphertext_b64, iv_b64) = payload.split_once("?iv=")?;
  let ciphertext = STANDARD.decode(ciphertext_b64).ok()?;
  let iv: [u8; 16] = STANDARD.decode(iv_b64).ok()?.try_into().ok()?;

  Aes256CbcDec::new(shared_secret.into(), (&iv).into())
    .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
    .ok()
}

/// Encrypts direct-message content for `peer_pubkey` (hex, x-only).
/// `None` when the peer key is malformed or off the curve.
pub fn encrypt_direct_message_content(
  keys: &Keys,
  peer_pubkey: &str,
  content: &str,
) -> Option<String> {
  let peer = XOnlyPublicKey::from_str(peer_pubkey).ok()?;
  let secret = shared_secret(keys.secret_key(), &peer).ok()?;
  Some(encrypt(content.as_bytes(), &secret))
}

/// Decrypts direct-message content received from `peer_pubkey`. `None`
/// on any malformed input, including non-UTF-8 plaintext.
pub fn decrypt_direct_message_content(
  keys: &Keys,
  peer_pubkey: &str,
  content: &str,
) -> Option<String> {
  let peer = XOnlyPublicKey::from_str(peer_pubkey).ok()?;
  let secret = shared_secret(keys.secret_key(), &peer).ok()?;
  String::from_utf8(decrypt(content, &secret)?).ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  fn mock_shared_secret() -> [u8; 32] {
    [7u8; 32]
  }

  #[test]
  fn decrypt_reverses_encrypt() {
    let secret = mock_shared_secret();
    for message in [
      &b""[..],
      b"short",
      b"exactly sixteen!",
      b"a somewhat longer message spanning multiple cipher blocks...",
    ] {
      let payload = encrypt(message, &secret);
      assert_eq!(decrypt(&payload, &secret).unwrap(), message);
    }
  }

  #[test]
  fn each_encryption_draws_a_fresh_iv() {
    let secret = mock_shared_secret();
    let mut ivs = std::collections::HashSet::new();
    for _ in 0..64 {
      let payload = encrypt(b"same message", &secret);
      let (_, iv) = payload.split_once("?iv=").unwrap();
      assert!(ivs.insert(iv.to_string()), "IV reused across encryptions");
    }
  }

  #[test]
  fn decrypt_returns_none_on_malformed_payloads() {
    let secret = mock_shared_secret();
    let payload = encrypt(b"hello", &secret);
    let (ciphertext_b64, iv_b64) = payload.split_once("?iv=").unwrap();

    // missing separator
    assert_eq!(decrypt(ciphertext_b64, &secret), None);
    // bad base64 on either side
    assert_eq!(decrypt(&format!("%%%?iv={iv_b64}"), &secret), None);
    assert_eq!(decrypt(&format!("{ciphertext_b64}?iv=%%%"), &secret), None);
    // wrong IV length
    assert_eq!(
      decrypt(&format!("{ciphertext_b64}?iv={}", STANDARD.encode([0u8; 8])), &secret),
      None
    );
    // ciphertext not a whole number of blocks
    assert_eq!(decrypt(&format!("AAAA?iv={iv_b64}"), &secret), None);
  }

  #[test]
  fn decrypt_under_the_wrong_secret_fails() {
    let payload = encrypt(b"hello", &mock_shared_secret());
    let wrong = [8u8; 32];
    // PKCS#7 unpadding almost surely fails; on the off chance it does
    // not, the plaintext still cannot match
    if let Some(plaintext) = decrypt(&payload, &wrong) {
      assert_ne!(plaintext, b"hello");
    }
  }

  #[test]
  fn shared_secret_is_symmetric() {
    let ours = Keys::generate();
    let theirs = Keys::generate();

    let from_ours = shared_secret(ours.secret_key(), &theirs.public_key()).unwrap();
    let from_theirs = shared_secret(theirs.secret_key(), &ours.public_key()).unwrap();
    assert_eq!(from_ours, from_theirs);
  }

  #[test]
  fn direct_message_content_round_trips_between_peers() {
    let ours = Keys::generate();
    let theirs = Keys::generate();

    let payload =
      encrypt_direct_message_content(&ours, &theirs.public_key_hex(), "nostr direct message")
        .unwrap();
    let plaintext =
      decrypt_direct_message_content(&theirs, &ours.public_key_hex(), &payload).unwrap();
    assert_eq!(plaintext, "nostr direct message");
  }

  #[test]
  fn malformed_peer_keys_yield_none() {
    let keys = Keys::generate();
    assert_eq!(
      encrypt_direct_message_content(&keys, "not a key", "hello"),
      None
    );
    assert_eq!(
      decrypt_direct_message_content(&keys, &"00".repeat(32), "x?iv=y"),
      None
    );
  }
}
