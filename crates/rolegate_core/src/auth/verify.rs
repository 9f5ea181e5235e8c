//! Signature verification for the login challenge.
//!
//! The wallet signs `keccak256(keccak256(nonce))` with its secp256k1 key and
//! sends the 65-byte `r || s || v` signature hex-encoded with a `0x` prefix.
//! We recover the signer's public key and compare the derived address with
//! the one claimed when the nonce was issued.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rolegate_db::Address;
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Length of a recoverable signature: 32-byte r, 32-byte s, 1-byte v.
pub const SIGNATURE_LEN: usize = 65;

/// Why a signature could not be turned into an address.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature is not hex after its 2-character prefix")]
    MalformedHex,
    #[error("signature is {0} bytes, expected 65")]
    WrongLength(usize),
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),
    #[error("signature scalars out of range")]
    InvalidScalars,
    #[error("public key recovery failed")]
    RecoveryFailed,
}

/// Digest the wallet signs for a nonce: the Keccak-256 of the Keccak-256 of
/// the nonce's UTF-8 bytes.
pub fn challenge_digest(nonce: &str) -> [u8; 32] {
    let first = Keccak256::digest(nonce.as_bytes());
    Keccak256::digest(first).into()
}

/// Address controlled by a public key: the low 20 bytes of the Keccak-256 of
/// the uncompressed point without its `0x04` tag.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(bytes)
}

/// Recover the address that produced `signature_hex` over `nonce`.
pub fn recover_address(nonce: &str, signature_hex: &str) -> Result<Address, SignatureError> {
    let body = signature_hex
        .get(2..)
        .ok_or(SignatureError::MalformedHex)?;
    let raw = hex::decode(body).map_err(|_| SignatureError::MalformedHex)?;
    if raw.len() != SIGNATURE_LEN {
        return Err(SignatureError::WrongLength(raw.len()));
    }

    let mut signature =
        Signature::from_slice(&raw[..64]).map_err(|_| SignatureError::InvalidScalars)?;

    // both the raw 0/1 and the legacy 27/28 encodings are in use
    let v = raw[64];
    let v = if v >= 27 { v - 27 } else { v };
    let mut recovery_id = RecoveryId::from_byte(v).ok_or(SignatureError::InvalidRecoveryId(raw[64]))?;

    // k256 only accepts low-s; flipping s flips the parity of R's y
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let digest = challenge_digest(nonce);
    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    Ok(address_of(&key))
}

/// Whether `signature_hex` is a signature over `nonce` by `address`.
///
/// Total over its inputs: anything malformed is simply `false`.
pub fn verify(nonce: &str, address: &Address, signature_hex: &str) -> bool {
    match recover_address(nonce, signature_hex) {
        Ok(recovered) => &recovered == address,
        Err(_) => false,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use k256::ecdsa::SigningKey;
    use rolegate_db::Address;

    use super::{address_of, challenge_digest};

    /// Deterministic wallet key for tests.
    pub fn wallet(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).expect("non-zero scalar below the group order")
    }

    pub fn wallet_address(key: &SigningKey) -> Address {
        address_of(key.verifying_key())
    }

    /// Sign a nonce the way the wallet does, returning `0x`-prefixed hex.
    pub fn sign_nonce(key: &SigningKey, nonce: &str) -> String {
        let digest = challenge_digest(nonce);
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&digest)
            .expect("signing a 32-byte digest");
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte());
        format!("0x{}", hex::encode(bytes))
    }
}
