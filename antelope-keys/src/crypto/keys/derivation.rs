//! Common key types

use std::fmt;

use secp256k1::{PublicKey as Secp256k1PublicKey, SecretKey, SECP256K1};

use crate::error::{Error, Result};

/// Length of a raw secp256k1 private scalar
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of a compressed secp256k1 public key
pub const PUBLIC_KEY_LEN: usize = 33;

/// Supported curve types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum KeyType {
    /// secp256k1
    K1,
}

impl KeyType {
    /// The curve tag used in type-tagged key strings
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::K1 => "K1",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secp256k1 private key
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    /// The raw private key bytes
    bytes: [u8; PRIVATE_KEY_LEN],
    /// The type of key
    key_type: KeyType,
}

impl PrivateKey {
    /// Create a private key from raw bytes, rejecting scalars outside `[1, n)`
    pub fn from_slice(bytes: &[u8], key_type: KeyType) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| Error::DerivationFailed(format!("Invalid secret key: {}", e)))?;
        Ok(Self::from_secret_key(&secret, key_type))
    }

    pub(crate) fn from_secret_key(secret: &SecretKey, key_type: KeyType) -> Self {
        Self { bytes: secret.secret_bytes(), key_type }
    }

    /// Get the raw private key bytes
    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.bytes
    }

    /// Get the key type
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Compute the matching compressed public key
    pub fn to_public(&self) -> Result<PublicKey> {
        let secret = SecretKey::from_slice(&self.bytes)
            .map_err(|e| Error::DerivationFailed(format!("Invalid secret key: {}", e)))?;
        let public = Secp256k1PublicKey::from_secret_key(SECP256K1, &secret);
        Ok(PublicKey::from_secp256k1(&public, self.key_type))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key_type", &self.key_type)
            .finish_non_exhaustive()
    }
}

/// A compressed secp256k1 public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// The compressed point bytes
    bytes: [u8; PUBLIC_KEY_LEN],
    /// The type of key
    key_type: KeyType,
}

impl PublicKey {
    /// Create a public key from compressed point bytes
    pub fn from_slice(bytes: &[u8], key_type: KeyType) -> Result<Self> {
        let public = Secp256k1PublicKey::from_slice(bytes)
            .map_err(|e| Error::EncodingFailed(format!("Invalid public key: {}", e)))?;
        Ok(Self::from_secp256k1(&public, key_type))
    }

    pub(crate) fn from_secp256k1(public: &Secp256k1PublicKey, key_type: KeyType) -> Self {
        Self { bytes: public.serialize(), key_type }
    }

    /// Get the compressed public key bytes
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.bytes
    }

    /// Get the key type
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }
}

/// A private key together with its public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// The private key
    private_key: PrivateKey,
    /// The public key
    public_key: PublicKey,
}

impl KeyPair {
    /// Create a key pair, computing the public half from the private key
    pub fn from_private(private_key: PrivateKey) -> Result<Self> {
        let public_key = private_key.to_public()?;
        Ok(Self { private_key, public_key })
    }

    /// Get the private key
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Get the public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Get the key type
    pub fn key_type(&self) -> KeyType {
        self.private_key.key_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_from_private() {
        let mut one = [0u8; 32];
        one[31] = 1;
        let pair = KeyPair::from_private(PrivateKey::from_slice(&one, KeyType::K1).unwrap()).unwrap();

        // 1 * G
        assert_eq!(
            hex::encode(pair.public_key().as_bytes()),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(pair.key_type(), KeyType::K1);
    }

    #[test]
    fn test_rejects_invalid_scalars() {
        assert!(matches!(
            PrivateKey::from_slice(&[0u8; 32], KeyType::K1),
            Err(Error::DerivationFailed(_))
        ));
        assert!(PrivateKey::from_slice(&[0xff; 32], KeyType::K1).is_err());
        assert!(PrivateKey::from_slice(&[1u8; 31], KeyType::K1).is_err());
    }

    #[test]
    fn test_rejects_invalid_points() {
        assert!(matches!(
            PublicKey::from_slice(&[2u8; 32], KeyType::K1),
            Err(Error::EncodingFailed(_))
        ));
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let key = PrivateKey::from_slice(&[7u8; 32], KeyType::K1).unwrap();
        assert!(!format!("{:?}", key).contains("7, 7"));
    }
}
