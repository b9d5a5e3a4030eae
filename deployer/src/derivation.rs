//! Implicit account derivation from MPC-issued secp256k1 public keys.
//!
//! Both derivations are pure: the same key always maps to the same
//! account identifier, and malformed keys are hard failures.

use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

/// Curve tag expected on every MPC-issued key.
pub const SECP256K1_PREFIX: &str = "secp256k1";

/// Length of an uncompressed secp256k1 public key without the
/// algorithm prefix byte.
const UNCOMPRESSED_KEY_LEN: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DerivationError {
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),
}

/// Decode a `"secp256k1:<base58>"` key into its 64 raw bytes.
///
/// A 65-byte key carrying the `0x04` uncompressed-form prefix is
/// accepted and stripped, so both encodings of the same key derive the
/// same account.
fn decode_secp256k1_key(public_key: &str) -> Result<Vec<u8>, DerivationError> {
    let (curve, data) = public_key.split_once(':').ok_or_else(|| {
        DerivationError::InvalidKeyFormat(format!(
            "expected \"{SECP256K1_PREFIX}:<base58>\", got {public_key:?}"
        ))
    })?;
    if curve != SECP256K1_PREFIX {
        return Err(DerivationError::InvalidKeyFormat(format!(
            "unexpected curve {curve:?}"
        )));
    }
    let bytes = bs58::decode(data)
        .into_vec()
        .map_err(|e| DerivationError::InvalidKeyFormat(e.to_string()))?;
    match bytes.len() {
        UNCOMPRESSED_KEY_LEN => Ok(bytes),
        n if n == UNCOMPRESSED_KEY_LEN + 1 && bytes[0] == 0x04 => Ok(bytes[1..].to_vec()),
        n => Err(DerivationError::InvalidKeyFormat(format!(
            "expected {UNCOMPRESSED_KEY_LEN} bytes of key data, got {n}"
        ))),
    }
}

/// Derive the chain-native implicit account id: lowercase hex of the
/// SHA-256 digest over the raw public key bytes.
pub fn derive_implicit_account_id(public_key: &str) -> Result<String, DerivationError> {
    let raw = decode_secp256k1_key(public_key)?;
    let account_id = hex::encode(Sha256::digest(&raw));
    // 32 digest bytes always hex-encode to 64 characters; the account id
    // namespace depends on it, so keep the check explicit
    if account_id.len() != 64 {
        return Err(DerivationError::InvalidKeyFormat(format!(
            "derived id {account_id:?} is not 64 hex characters"
        )));
    }
    Ok(account_id)
}

/// Derive the Ethereum-style implicit account id: `0x` plus the last 20
/// bytes of Keccak-256 over the `0x04`-prefixed uncompressed key,
/// lowercase hex.
pub fn derive_eth_address_from_mpc_key(public_key: &str) -> Result<String, DerivationError> {
    let raw = decode_secp256k1_key(public_key)?;
    let mut keccak = Keccak::v256();
    let mut digest = [0u8; 32];
    keccak.update(&[0x04]);
    keccak.update(&raw);
    keccak.finalize(&mut digest);
    Ok(format!("0x{}", hex::encode(&digest[12..])))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 64 zero bytes in base58: one '1' per leading zero byte.
    pub(crate) fn zero_key() -> String {
        format!("{SECP256K1_PREFIX}:{}", "1".repeat(64))
    }

    #[test]
    fn implicit_id_of_all_zero_key() {
        // SHA-256 over 64 zero bytes
        assert_eq!(
            derive_implicit_account_id(&zero_key()).unwrap(),
            "f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b"
        );
    }

    #[test]
    fn eth_address_shape() {
        let address = derive_eth_address_from_mpc_key(&zero_key()).unwrap();
        assert_eq!(address.len(), 42);
        assert!(address.starts_with("0x"));
        assert!(address[2..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn derivations_are_deterministic() {
        let key = zero_key();
        assert_eq!(
            derive_eth_address_from_mpc_key(&key).unwrap(),
            derive_eth_address_from_mpc_key(&key).unwrap()
        );
        assert_eq!(
            derive_implicit_account_id(&key).unwrap(),
            derive_implicit_account_id(&key).unwrap()
        );
    }

    #[test]
    fn prefixed_and_bare_encodings_agree() {
        let raw = [0x5au8; 64];
        let bare = format!("{SECP256K1_PREFIX}:{}", bs58::encode(raw).into_string());
        let mut prefixed_bytes = vec![0x04];
        prefixed_bytes.extend_from_slice(&raw);
        let prefixed = format!(
            "{SECP256K1_PREFIX}:{}",
            bs58::encode(prefixed_bytes).into_string()
        );

        assert_eq!(
            derive_eth_address_from_mpc_key(&bare).unwrap(),
            derive_eth_address_from_mpc_key(&prefixed).unwrap()
        );
        assert_eq!(
            derive_implicit_account_id(&bare).unwrap(),
            derive_implicit_account_id(&prefixed).unwrap()
        );
    }
}
