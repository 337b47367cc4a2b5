//! BIP32 extended keys and hierarchical derivation

use std::fmt;

use bitcoin::hashes::{hash160, Hash};
use hmac::{Hmac, Mac};
use secp256k1::{PublicKey as Secp256k1PublicKey, Scalar, SecretKey, SECP256K1};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use tracing::{debug, trace};

use crate::crypto::mnemonic::Seed;
use crate::error::{Error, Result};
use super::codec::{double_sha256_checksum, split_checksum};
use super::derivation::{KeyPair, KeyType, PrivateKey, PublicKey};
use super::path::{ChildNumber, DerivationPath};

/// Mainnet extended private key version (`xprv`)
pub const VERSION_XPRV: [u8; 4] = [0x04, 0x88, 0xAD, 0xE4];

/// Mainnet extended public key version (`xpub`)
pub const VERSION_XPUB: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];

/// HMAC key used to derive the master node
const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// Serialized extended key length before the checksum
const SERIALIZED_LEN: usize = 78;

/// A node of the BIP32 tree.
///
/// Nodes reached from a seed hold both halves of the key pair. Nodes parsed
/// from an `xpub` (or neutered) hold only the public key and cannot produce
/// hardened children.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtendedKey {
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: ChildNumber,
    chain_code: [u8; 32],
    private_key: Option<SecretKey>,
    public_key: Secp256k1PublicKey,
}

/// HMAC-SHA512 split into its left (key material) and right (chain code) halves
fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<([u8; 32], [u8; 32])> {
    let mut hmac = Hmac::<Sha512>::new_from_slice(key)
        .map_err(|_| Error::DerivationFailed("HMAC error".to_string()))?;

    hmac.update(data);
    let result = hmac.finalize().into_bytes();

    let mut left = [0u8; 32];
    let mut right = [0u8; 32];

    left.copy_from_slice(&result[0..32]);
    right.copy_from_slice(&result[32..64]);

    Ok((left, right))
}

impl ExtendedKey {
    /// Derive the master node from a BIP39 seed
    pub fn new_master(seed: &[u8]) -> Result<Self> {
        if !(16..=64).contains(&seed.len()) {
            return Err(Error::DerivationFailed(format!(
                "Seed must be between 16 and 64 bytes, got {}",
                seed.len()
            )));
        }

        let (secret_key, chain_code) = hmac_sha512(MASTER_HMAC_KEY, seed)?;
        let secret_key = SecretKey::from_slice(&secret_key)
            .map_err(|e| Error::DerivationFailed(format!("Invalid master key: {}", e)))?;
        let public_key = Secp256k1PublicKey::from_secret_key(SECP256K1, &secret_key);

        Ok(Self {
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: ChildNumber::ZERO,
            chain_code,
            private_key: Some(secret_key),
            public_key,
        })
    }

    /// Derive a single child node.
    ///
    /// An out-of-range intermediate scalar is reported as `DerivationFailed`
    /// instead of skipping to the next index.
    pub fn derive_child(&self, child: ChildNumber) -> Result<Self> {
        let depth = self.depth.checked_add(1).ok_or_else(|| {
            Error::DerivationFailed("Maximum derivation depth reached".to_string())
        })?;

        let mut data = Vec::with_capacity(37);

        match (child.is_hardened(), &self.private_key) {
            (true, Some(secret_key)) => {
                data.push(0);
                data.extend_from_slice(&secret_key.secret_bytes());
            }
            (true, None) => {
                return Err(Error::DerivationFailed(format!(
                    "Cannot derive hardened child {} from a public-only key",
                    child
                )));
            }
            (false, _) => {
                data.extend_from_slice(&self.public_key.serialize());
            }
        }

        data.extend_from_slice(&child.to_u32().to_be_bytes());

        let (tweak, chain_code) = hmac_sha512(&self.chain_code, &data)?;
        let tweak = Scalar::from_be_bytes(tweak).map_err(|_| {
            Error::DerivationFailed(format!("Derived scalar for child {} is out of range", child))
        })?;

        let (private_key, public_key) = match self.private_key {
            Some(secret_key) => {
                let child_key = secret_key.add_tweak(&tweak).map_err(|e| {
                    Error::DerivationFailed(format!("Invalid child key {}: {}", child, e))
                })?;
                (Some(child_key), Secp256k1PublicKey::from_secret_key(SECP256K1, &child_key))
            }
            None => {
                let child_key = self.public_key.add_exp_tweak(SECP256K1, &tweak).map_err(|e| {
                    Error::DerivationFailed(format!("Invalid child public key {}: {}", child, e))
                })?;
                (None, child_key)
            }
        };

        trace!(depth, child = %child, "derived child node");

        Ok(Self {
            depth,
            parent_fingerprint: self.fingerprint(),
            child_number: child,
            chain_code,
            private_key,
            public_key,
        })
    }

    /// Walk a path from this node, one step at a time, left to right
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self> {
        path.iter()
            .try_fold(self.clone(), |node, child| node.derive_child(*child))
    }

    /// Drop the private half of this node
    pub fn neuter(&self) -> Self {
        Self { private_key: None, ..self.clone() }
    }

    pub fn is_private(&self) -> bool {
        self.private_key.is_some()
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn child_number(&self) -> ChildNumber {
        self.child_number
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    /// First four bytes of HASH160 of the compressed public key
    pub fn fingerprint(&self) -> [u8; 4] {
        let hash = hash160::Hash::hash(&self.public_key.serialize()).to_byte_array();
        let mut fingerprint = [0u8; 4];
        fingerprint.copy_from_slice(&hash[..4]);
        fingerprint
    }

    pub fn private_key(&self) -> Option<PrivateKey> {
        self.private_key
            .as_ref()
            .map(|secret_key| PrivateKey::from_secret_key(secret_key, KeyType::K1))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_secp256k1(&self.public_key, KeyType::K1)
    }

    /// The node's key pair; fails on a public-only node
    pub fn key_pair(&self) -> Result<KeyPair> {
        let private_key = self.private_key().ok_or_else(|| {
            Error::DerivationFailed("Node has no private key material".to_string())
        })?;
        KeyPair::from_private(private_key)
    }

    /// Serialize as `xprv…`; fails on a public-only node
    pub fn to_extended_private_key(&self) -> Result<String> {
        let secret_key = self.private_key.as_ref().ok_or_else(|| {
            Error::EncodingFailed("Cannot export xprv from a public-only key".to_string())
        })?;

        let mut key = [0u8; 33];
        key[1..].copy_from_slice(&secret_key.secret_bytes());
        Ok(self.serialize(VERSION_XPRV, &key))
    }

    /// Serialize as `xpub…`
    pub fn to_extended_public_key(&self) -> String {
        self.serialize(VERSION_XPUB, &self.public_key.serialize())
    }

    fn serialize(&self, version: [u8; 4], key: &[u8; 33]) -> String {
        let mut data = Vec::with_capacity(SERIALIZED_LEN + 4);
        data.extend_from_slice(&version);
        data.push(self.depth);
        data.extend_from_slice(&self.parent_fingerprint);
        data.extend_from_slice(&self.child_number.to_u32().to_be_bytes());
        data.extend_from_slice(&self.chain_code);
        data.extend_from_slice(key);

        let checksum = double_sha256_checksum(&data);
        data.extend_from_slice(&checksum);

        bs58::encode(data).into_string()
    }

    /// Parse an `xprv…` or `xpub…` string
    pub fn from_extended_key(text: &str) -> Result<Self> {
        let data = bs58::decode(text)
            .into_vec()
            .map_err(|e| Error::EncodingFailed(format!("Invalid base58: {}", e)))?;
        let data = split_checksum(&data, double_sha256_checksum)?;

        if data.len() != SERIALIZED_LEN {
            return Err(Error::EncodingFailed(format!(
                "Extended key must be {} bytes, got {}",
                SERIALIZED_LEN,
                data.len()
            )));
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&data[0..4]);
        let depth = data[4];
        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&data[5..9]);
        let mut child_number = [0u8; 4];
        child_number.copy_from_slice(&data[9..13]);
        let child_number = ChildNumber::from(u32::from_be_bytes(child_number));
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&data[13..45]);
        let key = &data[45..78];

        if depth == 0 && (parent_fingerprint != [0u8; 4] || child_number.to_u32() != 0) {
            return Err(Error::EncodingFailed(
                "Master key with non-zero parent fingerprint or child number".to_string(),
            ));
        }

        let (private_key, public_key) = match version {
            VERSION_XPRV => {
                if key[0] != 0 {
                    return Err(Error::EncodingFailed("Malformed private key data".to_string()));
                }
                let secret_key = SecretKey::from_slice(&key[1..])
                    .map_err(|e| Error::EncodingFailed(format!("Invalid private key: {}", e)))?;
                let public_key = Secp256k1PublicKey::from_secret_key(SECP256K1, &secret_key);
                (Some(secret_key), public_key)
            }
            VERSION_XPUB => {
                let public_key = Secp256k1PublicKey::from_slice(key)
                    .map_err(|e| Error::EncodingFailed(format!("Invalid public key: {}", e)))?;
                (None, public_key)
            }
            other => {
                return Err(Error::EncodingFailed(format!(
                    "Unknown extended key version: {}",
                    hex::encode(other)
                )))
            }
        };

        Ok(Self { depth, parent_fingerprint, child_number, chain_code, private_key, public_key })
    }
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("depth", &self.depth)
            .field("parent_fingerprint", &hex::encode(self.parent_fingerprint))
            .field("child_number", &self.child_number)
            .field("is_private", &self.is_private())
            .field("public_key", &hex::encode(self.public_key.serialize()))
            .finish_non_exhaustive()
    }
}

/// Extended key pair exported at the account level for watch-only use
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterExtendedKeys {
    /// `xprv…` text
    pub private_extended_key: String,
    /// `xpub…` text
    pub public_extended_key: String,
}

impl fmt::Debug for MasterExtendedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterExtendedKeys")
            .field("public_extended_key", &self.public_extended_key)
            .finish_non_exhaustive()
    }
}

/// Derive the node at `path` from a seed
pub fn derive_node(seed: &Seed, path: &DerivationPath) -> Result<ExtendedKey> {
    debug!(path = %path, "deriving node from seed");
    ExtendedKey::new_master(seed.as_bytes())?.derive_path(path)
}

/// Export the xprv/xpub pair of the node at `account_path`
pub fn export_master_extended_keys(
    seed: &Seed,
    account_path: &DerivationPath,
) -> Result<MasterExtendedKeys> {
    let node = derive_node(seed, account_path)?;

    Ok(MasterExtendedKeys {
        private_extended_key: node.to_extended_private_key()?,
        public_extended_key: node.to_extended_public_key(),
    })
}

/// Derive a non-hardened child public key from an exported `xpub`.
///
/// No private material is involved; an `xprv` is refused.
pub fn derive_from_master_public_key(extended_public_key: &str, child_index: u32) -> Result<PublicKey> {
    let child = ChildNumber::normal(child_index).map_err(|_| {
        Error::DerivationFailed(format!(
            "Cannot derive hardened child {} from an extended public key",
            child_index
        ))
    })?;

    let node = ExtendedKey::from_extended_key(extended_public_key)?;
    if node.is_private() {
        return Err(Error::EncodingFailed(
            "Expected an extended public key, got an extended private key".to_string(),
        ));
    }

    debug!(depth = node.depth(), child_index, "deriving public key from xpub");
    Ok(node.derive_child(child)?.public_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::path::HARDENED_OFFSET;

    // BIP32 test vector 1
    const TV1_SEED: &str = "000102030405060708090a0b0c0d0e0f";
    const TV1_M_XPRV: &str = "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi";
    const TV1_M_XPUB: &str = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";
    const TV1_M0H_XPRV: &str = "xprv9uHRZZhk6KAJC1avXpDAp4MDc3sQKNxDiPvvkX8Br5ngLNv1TxvUxt4cV1rGL5hj6KCesnDYUhd7oWgT11eZG7XnxHrnYeSvkzY7d2bhkJ7";
    const TV1_M0H_XPUB: &str = "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw";
    const TV1_M0H1_XPRV: &str = "xprv9wTYmMFdV23N2TdNG573QoEsfRrWKQgWeibmLntzniatZvR9BmLnvSxqu53Kw1UmYPxLgboyZQaXwTCg8MSY3H2EU4pWcQDnRnrVA1xe8fs";
    const TV1_M0H1_XPUB: &str = "xpub6ASuArnXKPbfEwhqN6e3mwBcDTgzisQN1wXN9BJcM47sSikHjJf3UFHKkNAWbWMiGj7Wf5uMash7SyYq527Hqck2AxYysAA7xmALppuCkwQ";

    fn tv1_master() -> ExtendedKey {
        ExtendedKey::new_master(&hex::decode(TV1_SEED).unwrap()).unwrap()
    }

    #[test]
    fn test_bip32_vector_master() {
        let master = tv1_master();

        assert_eq!(master.to_extended_private_key().unwrap(), TV1_M_XPRV);
        assert_eq!(master.to_extended_public_key(), TV1_M_XPUB);
        assert_eq!(master.depth(), 0);
    }

    #[test]
    fn test_bip32_vector_children() {
        let master = tv1_master();

        let m0h = master.derive_path(&"m/0'".parse().unwrap()).unwrap();
        assert_eq!(m0h.to_extended_private_key().unwrap(), TV1_M0H_XPRV);
        assert_eq!(m0h.to_extended_public_key(), TV1_M0H_XPUB);

        let m0h1 = master.derive_path(&"m/0'/1".parse().unwrap()).unwrap();
        assert_eq!(m0h1.to_extended_private_key().unwrap(), TV1_M0H1_XPRV);
        assert_eq!(m0h1.to_extended_public_key(), TV1_M0H1_XPUB);
        assert_eq!(m0h1.depth(), 2);
        assert_eq!(m0h1.parent_fingerprint(), m0h.fingerprint());
    }

    #[test]
    fn test_public_derivation_matches_private() {
        let m0h = tv1_master().derive_child(ChildNumber::hardened(0).unwrap()).unwrap();
        let one = ChildNumber::normal(1).unwrap();
        let private_child = m0h.derive_child(one).unwrap();
        let public_child = m0h.neuter().derive_child(one).unwrap();

        assert!(!public_child.is_private());
        assert_eq!(public_child.to_extended_public_key(), TV1_M0H1_XPUB);
        assert_eq!(public_child, private_child.neuter());
    }

    #[test]
    fn test_hardened_from_public_fails() {
        let public = tv1_master().neuter();
        let err = public.derive_child(ChildNumber::hardened(0).unwrap()).unwrap_err();

        assert!(matches!(err, Error::DerivationFailed(_)));
        assert!(public.key_pair().is_err());
        assert!(public.to_extended_private_key().is_err());
    }

    #[test]
    fn test_top_bit_index_from_public_is_hardened() {
        let public = ExtendedKey::from_extended_key(TV1_M0H_XPUB).unwrap();

        assert!(ChildNumber::normal(HARDENED_OFFSET).is_err());
        let child = ChildNumber::from(HARDENED_OFFSET);
        assert!(child.is_hardened());
        assert!(matches!(public.derive_child(child), Err(Error::DerivationFailed(_))));

        let err = derive_from_master_public_key(TV1_M0H_XPUB, HARDENED_OFFSET).unwrap_err();
        assert!(matches!(err, Error::DerivationFailed(_)));
    }

    #[test]
    fn test_parse_round_trip() {
        let parsed = ExtendedKey::from_extended_key(TV1_M0H_XPRV).unwrap();
        assert!(parsed.is_private());
        assert_eq!(parsed.child_number(), ChildNumber::hardened(0).unwrap());
        assert_eq!(parsed.to_extended_private_key().unwrap(), TV1_M0H_XPRV);

        let parsed = ExtendedKey::from_extended_key(TV1_M0H_XPUB).unwrap();
        assert!(!parsed.is_private());
        assert_eq!(parsed.to_extended_public_key(), TV1_M0H_XPUB);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let mut corrupted = TV1_M_XPUB.to_string();
        corrupted.replace_range(20..21, "A");

        for bad in ["", "xpub", "0OIl", corrupted.as_str()] {
            let err = ExtendedKey::from_extended_key(bad).unwrap_err();
            assert!(matches!(err, Error::EncodingFailed(_)), "{:?} gave {:?}", bad, err);
        }
    }

    #[test]
    fn test_derive_from_master_public_key() {
        let expected = tv1_master()
            .derive_path(&"m/0'/1".parse().unwrap())
            .unwrap()
            .public_key();

        assert_eq!(derive_from_master_public_key(TV1_M0H_XPUB, 1).unwrap(), expected);
        assert!(matches!(
            derive_from_master_public_key(TV1_M0H_XPUB, HARDENED_OFFSET),
            Err(Error::DerivationFailed(_))
        ));
        assert!(matches!(
            derive_from_master_public_key(TV1_M0H_XPRV, 1),
            Err(Error::EncodingFailed(_))
        ));
    }

    #[test]
    fn test_rejects_bad_seed_length() {
        assert!(ExtendedKey::new_master(&[0u8; 15]).is_err());
        assert!(ExtendedKey::new_master(&[0u8; 65]).is_err());
    }

    #[test]
    fn test_debug_hides_private_material() {
        let master = tv1_master();
        let rendered = format!("{:?}", master);
        let secret = hex::encode(master.private_key().unwrap().as_bytes());

        assert!(!rendered.contains(&secret));
        assert!(rendered.contains("is_private: true"));
    }
}
