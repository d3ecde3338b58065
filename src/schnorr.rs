use std::str::FromStr;

use bitcoin_hashes::{hex::FromHex, sha256};
use secp256k1::{schnorr, Message, Secp256k1, SecretKey, Signing, Verification, XOnlyPublicKey};

/// Schnorr signing/verification error
#[derive(thiserror::Error, Debug)]
pub enum SchnorrError {
  /// Error related to bitcoin_hashes::hex
  #[error(transparent)]
  SHA256(#[from] bitcoin_hashes::hex::Error),

  /// Error secp256k1
  #[error(transparent)]
  SECP256K1(#[from] secp256k1::Error),
}

///
/// Signs a Schnorr signature over an already-hashed message.
///
/// `msg` is the lowercase hex of a 32-byte digest (an event id). The
/// signature commits to those 32 bytes, nothing else.
///
/// ## Arguments
///
/// * `secp` - A Secp256k1 engine to execute the signature.
/// * `msg` - A hex-encoded SHA256 digest.
/// * `seckey` - The private key to sign the digest with.
///
pub fn sign_schnorr<C: Signing>(
  secp: &Secp256k1<C>,
  msg: &str,
  seckey: &SecretKey,
) -> Result<schnorr::Signature, SchnorrError> {
  let hash_from_hex = sha256::Hash::from_hex(msg)?;
  let msg = Message::from_slice(hash_from_hex.as_ref())?;
  let keypair = secp256k1::KeyPair::from_secret_key(secp, seckey);
  Ok(secp.sign_schnorr_no_aux_rand(&msg, &keypair))
}

///
/// Verifies a Schnorr signature over an already-hashed message.
///
/// This is a predicate, not a fallible operation: malformed hex, a wrong
/// digest length or an invalid curve point all evaluate to `false`,
/// because callers run it on input a relay (or an attacker) controls.
///
/// ## Arguments
///
/// * `secp` - A Secp256k1 engine to execute the verification.
/// * `msg` - A hex-encoded SHA256 digest.
/// * `sig` - The Schnorr signature to verify.
/// * `pubkey` - The hex-encoded x-only public key to verify against.
///
pub fn verify_schnorr<C: Verification>(
  secp: &Secp256k1<C>,
  msg: &str,
  sig: &schnorr::Signature,
  pubkey: &str,
) -> bool {
  let hash_from_hex = match sha256::Hash::from_hex(msg) {
    Ok(hash) => hash,
    Err(_) => return false,
  };
  let msg = match Message::from_slice(hash_from_hex.as_ref()) {
    Ok(msg) => msg,
    Err(_) => return false,
  };
  let x_only_pubkey = match XOnlyPublicKey::from_str(pubkey) {
    Ok(pubkey) => pubkey,
    Err(_) => return false,
  };

  secp.verify_schnorr(sig, &msg, &x_only_pubkey).is_ok()
}
