use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// Curve tag carried by every serialized key string.
pub const ED25519_PREFIX: &str = "ed25519";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid key encoding: {0}")]
    InvalidEncoding(String),
    #[error("unsupported curve {0:?}, expected \"ed25519\"")]
    UnsupportedCurve(String),
    #[error("invalid key length {0}")]
    InvalidLength(usize),
    #[error("invalid signature")]
    InvalidSignature,
}

/// An ed25519 key pair in the chain's string encoding:
/// `"ed25519:<base58>"` with 64 secret bytes (seed followed by public
/// key) or 32 public bytes.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a fresh random key pair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Parse a key pair from its secret string form. Accepts the 64-byte
    /// seed‖public encoding and the bare 32-byte seed.
    pub fn from_string(secret: &str) -> Result<Self, KeyError> {
        let data = split_curve_tag(secret)?;
        let bytes = bs58::decode(data)
            .into_vec()
            .map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;

        let signing_key = match bytes.len() {
            64 => {
                let keypair_bytes: [u8; 64] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
                SigningKey::from_keypair_bytes(&keypair_bytes)
                    .map_err(|e| KeyError::InvalidEncoding(e.to_string()))?
            }
            32 => {
                let seed: [u8; 32] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
                SigningKey::from_bytes(&seed)
            }
            n => return Err(KeyError::InvalidLength(n)),
        };
        Ok(Self { signing_key })
    }

    /// Secret string form, suitable for the key store.
    pub fn to_secret_string(&self) -> String {
        let encoded = bs58::encode(self.signing_key.to_keypair_bytes()).into_string();
        format!("{ED25519_PREFIX}:{encoded}")
    }

    /// Public key string form, the shape contract arguments expect.
    pub fn public_key(&self) -> String {
        let encoded = bs58::encode(self.signing_key.verifying_key().as_bytes()).into_string();
        format!("{ED25519_PREFIX}:{encoded}")
    }

    /// Sign `message`, returning the 64-byte detached signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

/// Verify a detached signature against a serialized public key.
pub fn verify_signature(
    public_key: &str,
    message: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let data = split_curve_tag(public_key)?;
    let bytes = bs58::decode(data)
        .into_vec()
        .map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;
    let raw: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
    let verifying_key =
        VerifyingKey::from_bytes(&raw).map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;
    let signature = Signature::from_slice(signature).map_err(|_| KeyError::InvalidSignature)?;
    Ok(verifying_key.verify(message, &signature).is_ok())
}

fn split_curve_tag(key: &str) -> Result<&str, KeyError> {
    let (curve, data) = key
        .split_once(':')
        .ok_or_else(|| KeyError::InvalidEncoding(format!("missing curve tag in {key:?}")))?;
    if curve != ED25519_PREFIX {
        return Err(KeyError::UnsupportedCurve(curve.to_string()));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_round_trip_through_strings() {
        let key_pair = KeyPair::generate();
        let restored = KeyPair::from_string(&key_pair.to_secret_string()).unwrap();
        assert_eq!(key_pair.public_key(), restored.public_key());
        assert!(key_pair.public_key().starts_with("ed25519:"));
    }

    #[test]
    fn signatures_verify_and_tampering_invalidates() {
        let key_pair = KeyPair::generate();
        let message = b"payload bytes";
        let signature = key_pair.sign(message);

        assert_eq!(signature.len(), 64);
        assert_eq!(
            verify_signature(&key_pair.public_key(), message, &signature),
            Ok(true)
        );

        let mut tampered = message.to_vec();
        tampered[0] ^= 0x01;
        assert_eq!(
            verify_signature(&key_pair.public_key(), &tampered, &signature),
            Ok(false)
        );
    }

    #[test]
    fn rejects_foreign_curves_and_bad_lengths() {
        assert!(matches!(
            KeyPair::from_string("secp256k1:abc"),
            Err(KeyError::UnsupportedCurve(curve)) if curve == "secp256k1"
        ));
        assert!(matches!(
            KeyPair::from_string("ed25519:1111"),
            Err(KeyError::InvalidLength(_))
        ));
        assert!(matches!(
            KeyPair::from_string("no-tag-here"),
            Err(KeyError::InvalidEncoding(_))
        ));
    }
}
