//! Antelope key text encodings
//!
//! Two formats are in circulation. The legacy one is the Bitcoin-style WIF
//! for private keys (`5…`) and `EOS…` for public keys. The newer type-tagged
//! one (`PVT_K1_…`, `PUB_K1_…`) names the curve and binds the tag into a
//! RIPEMD160 checksum. Both are implemented behind [`KeyCodec`].

use bitcoin::hashes::{ripemd160, Hash};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use super::derivation::{KeyType, PrivateKey, PublicKey, PRIVATE_KEY_LEN, PUBLIC_KEY_LEN};

/// Network version byte prepended to WIF private keys
pub const WIF_VERSION: u8 = 0x80;

/// Trailing flag marking a WIF key whose public key is compressed
const WIF_COMPRESSED_FLAG: u8 = 0x01;

/// Prefix of legacy public keys
pub const LEGACY_PUBLIC_PREFIX: &str = "EOS";

const CHECKSUM_LEN: usize = 4;

/// Converts raw keys to and from a chain text format
pub trait KeyCodec: Send + Sync {
    /// Short name used in logs and configuration
    fn name(&self) -> &'static str;

    fn encode_private(&self, key: &PrivateKey) -> Result<String>;

    fn encode_public(&self, key: &PublicKey) -> Result<String>;

    fn decode_private(&self, text: &str) -> Result<PrivateKey>;

    fn decode_public(&self, text: &str) -> Result<PublicKey>;
}

/// `first4(SHA256(SHA256(data)))`
pub fn double_sha256_checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);

    let mut checksum = [0u8; CHECKSUM_LEN];
    checksum.copy_from_slice(&second[..CHECKSUM_LEN]);
    checksum
}

/// `first4(RIPEMD160(data || suffix))`
fn ripemd160_checksum(data: &[u8], suffix: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut buf = Vec::with_capacity(data.len() + suffix.len());
    buf.extend_from_slice(data);
    buf.extend_from_slice(suffix);
    let hash = ripemd160::Hash::hash(&buf).to_byte_array();

    let mut checksum = [0u8; CHECKSUM_LEN];
    checksum.copy_from_slice(&hash[..CHECKSUM_LEN]);
    checksum
}

fn check_len(bytes: &[u8], expected: usize, what: &str) -> Result<()> {
    if bytes.len() != expected {
        return Err(Error::EncodingFailed(format!(
            "{} must be {} bytes, got {}",
            what,
            expected,
            bytes.len()
        )));
    }
    Ok(())
}

fn base58_decode(text: &str) -> Result<Vec<u8>> {
    bs58::decode(text)
        .into_vec()
        .map_err(|e| Error::EncodingFailed(format!("Invalid base58: {}", e)))
}

/// Split `payload || checksum` and verify the checksum
pub(crate) fn split_checksum<'a>(
    data: &'a [u8],
    expected_checksum: impl FnOnce(&[u8]) -> [u8; CHECKSUM_LEN],
) -> Result<&'a [u8]> {
    if data.len() < CHECKSUM_LEN {
        return Err(Error::EncodingFailed("Data too short for checksum".to_string()));
    }
    let (payload, checksum) = data.split_at(data.len() - CHECKSUM_LEN);
    if checksum != expected_checksum(payload) {
        return Err(Error::EncodingFailed("Checksum mismatch".to_string()));
    }
    Ok(payload)
}

/// Encode a raw 32-byte private key as uncompressed WIF
///
/// `Base58(0x80 || key || first4(SHA256(SHA256(0x80 || key))))`
pub fn encode_wif(key: &[u8]) -> Result<String> {
    check_len(key, PRIVATE_KEY_LEN, "Private key")?;

    let mut data = Vec::with_capacity(1 + PRIVATE_KEY_LEN + CHECKSUM_LEN);
    data.push(WIF_VERSION);
    data.extend_from_slice(key);
    let checksum = double_sha256_checksum(&data);
    data.extend_from_slice(&checksum);

    Ok(bs58::encode(data).into_string())
}

/// Decode a WIF private key, accepting the compressed-flag form as well
pub fn decode_wif(text: &str) -> Result<[u8; PRIVATE_KEY_LEN]> {
    let data = base58_decode(text)?;
    let payload = split_checksum(&data, double_sha256_checksum)?;

    let key = match payload {
        [WIF_VERSION, key @ ..] if key.len() == PRIVATE_KEY_LEN => key,
        [WIF_VERSION, key @ .., WIF_COMPRESSED_FLAG] if key.len() == PRIVATE_KEY_LEN => key,
        [WIF_VERSION, ..] => {
            return Err(Error::EncodingFailed(format!(
                "Unexpected WIF payload length: {}",
                payload.len()
            )))
        }
        _ => return Err(Error::EncodingFailed("Unexpected WIF version byte".to_string())),
    };

    let mut out = [0u8; PRIVATE_KEY_LEN];
    out.copy_from_slice(key);
    Ok(out)
}

/// Legacy formats: WIF private keys and `EOS`-prefixed public keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyChecksumEncoding;

impl KeyCodec for LegacyChecksumEncoding {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn encode_private(&self, key: &PrivateKey) -> Result<String> {
        encode_wif(key.as_bytes())
    }

    fn encode_public(&self, key: &PublicKey) -> Result<String> {
        let bytes = key.as_bytes();
        let mut data = Vec::with_capacity(PUBLIC_KEY_LEN + CHECKSUM_LEN);
        data.extend_from_slice(bytes);
        data.extend_from_slice(&ripemd160_checksum(bytes, &[]));

        Ok(format!("{}{}", LEGACY_PUBLIC_PREFIX, bs58::encode(data).into_string()))
    }

    fn decode_private(&self, text: &str) -> Result<PrivateKey> {
        let key = decode_wif(text)?;
        PrivateKey::from_slice(&key, KeyType::K1)
            .map_err(|e| Error::EncodingFailed(e.to_string()))
    }

    fn decode_public(&self, text: &str) -> Result<PublicKey> {
        let body = text.strip_prefix(LEGACY_PUBLIC_PREFIX).ok_or_else(|| {
            Error::EncodingFailed(format!("Public key must start with {}", LEGACY_PUBLIC_PREFIX))
        })?;
        let data = base58_decode(body)?;
        let key = split_checksum(&data, |payload| ripemd160_checksum(payload, &[]))?;
        check_len(key, PUBLIC_KEY_LEN, "Public key")?;

        PublicKey::from_slice(key, KeyType::K1)
    }
}

/// Type-tagged formats: `PVT_<curve>_…` and `PUB_<curve>_…`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructuredTypeTagEncoding;

impl StructuredTypeTagEncoding {
    fn encode(kind: &str, key_type: KeyType, bytes: &[u8]) -> String {
        let tag = key_type.as_str();
        let mut data = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
        data.extend_from_slice(bytes);
        data.extend_from_slice(&ripemd160_checksum(bytes, tag.as_bytes()));

        format!("{}_{}_{}", kind, tag, bs58::encode(data).into_string())
    }

    fn decode(kind: &str, text: &str, expected_len: usize) -> Result<(KeyType, Vec<u8>)> {
        let mut parts = text.splitn(3, '_');
        let (prefix, tag, body) = match (parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(tag), Some(body)) => (prefix, tag, body),
            _ => return Err(Error::EncodingFailed(format!("Malformed {} key string", kind))),
        };
        if prefix != kind {
            return Err(Error::EncodingFailed(format!(
                "Expected {} key, found {} prefix",
                kind, prefix
            )));
        }
        let key_type = match tag {
            "K1" => KeyType::K1,
            other => {
                return Err(Error::EncodingFailed(format!("Unsupported curve type: {}", other)))
            }
        };

        let data = base58_decode(body)?;
        let key = split_checksum(&data, |payload| ripemd160_checksum(payload, tag.as_bytes()))?;
        check_len(key, expected_len, "Key")?;

        Ok((key_type, key.to_vec()))
    }
}

impl KeyCodec for StructuredTypeTagEncoding {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn encode_private(&self, key: &PrivateKey) -> Result<String> {
        Ok(Self::encode("PVT", key.key_type(), key.as_bytes()))
    }

    fn encode_public(&self, key: &PublicKey) -> Result<String> {
        Ok(Self::encode("PUB", key.key_type(), key.as_bytes()))
    }

    fn decode_private(&self, text: &str) -> Result<PrivateKey> {
        let (key_type, bytes) = Self::decode("PVT", text, PRIVATE_KEY_LEN)?;
        PrivateKey::from_slice(&bytes, key_type)
            .map_err(|e| Error::EncodingFailed(e.to_string()))
    }

    fn decode_public(&self, text: &str) -> Result<PublicKey> {
        let (key_type, bytes) = Self::decode("PUB", text, PUBLIC_KEY_LEN)?;
        PublicKey::from_slice(&bytes, key_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key pair shipped with nodeos
    const DEV_WIF: &str = "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3";
    const DEV_PRIVATE_HEX: &str = "d2653ff7cbb2d8ff129ac27ef5781ce68b2558c41a74af1f2ddca635cbeef07d";
    const DEV_LEGACY_PUBLIC: &str = "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV";
    const DEV_TAGGED_PRIVATE: &str = "PVT_K1_2bfGi9rYsXQSXXTvJbDAPhHLQUojjaNLomdm3cEJ1XTzMqUt3V";
    const DEV_TAGGED_PUBLIC: &str = "PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63";

    fn dev_key() -> PrivateKey {
        PrivateKey::from_slice(&hex::decode(DEV_PRIVATE_HEX).unwrap(), KeyType::K1).unwrap()
    }

    #[test]
    fn test_double_sha256_checksum_vector() {
        let data: Vec<u8> = (0u8..37).collect();
        assert_eq!(hex::encode(double_sha256_checksum(&data)), "96682469");
    }

    #[test]
    fn test_wif_vector() {
        assert_eq!(
            encode_wif(&[1u8; 32]).unwrap(),
            "5HpjE2Hs7vjU4SN3YyPQCdhzCu92WoEeuE6PWNuiPyTu3ESGnzn"
        );
    }

    #[test]
    fn test_wif_rejects_wrong_length() {
        assert!(matches!(encode_wif(&[1u8; 31]), Err(Error::EncodingFailed(_))));
        assert!(matches!(encode_wif(&[1u8; 33]), Err(Error::EncodingFailed(_))));
    }

    #[test]
    fn test_legacy_dev_key() {
        let codec = LegacyChecksumEncoding;
        let key = dev_key();

        assert_eq!(codec.encode_private(&key).unwrap(), DEV_WIF);
        assert_eq!(codec.encode_public(&key.to_public().unwrap()).unwrap(), DEV_LEGACY_PUBLIC);
        assert_eq!(codec.decode_private(DEV_WIF).unwrap(), key);
        assert_eq!(codec.decode_public(DEV_LEGACY_PUBLIC).unwrap(), key.to_public().unwrap());
    }

    #[test]
    fn test_decode_compressed_wif() {
        let codec = LegacyChecksumEncoding;
        let key = codec
            .decode_private("L4Gh6zmE7MGoBuRnbyAJajH8xGME9BdL2yAgsYrcXKnaANtNqMhs")
            .unwrap();
        assert_eq!(key, dev_key());
    }

    #[test]
    fn test_structured_dev_key() {
        let codec = StructuredTypeTagEncoding;
        let key = dev_key();

        assert_eq!(codec.encode_private(&key).unwrap(), DEV_TAGGED_PRIVATE);
        assert_eq!(codec.encode_public(&key.to_public().unwrap()).unwrap(), DEV_TAGGED_PUBLIC);
        assert_eq!(codec.decode_private(DEV_TAGGED_PRIVATE).unwrap(), key);
        assert_eq!(codec.decode_public(DEV_TAGGED_PUBLIC).unwrap(), key.to_public().unwrap());
    }

    #[test]
    fn test_rejects_corrupted_checksums() {
        let mut wif = DEV_WIF.to_string();
        wif.replace_range(10..11, "z");
        assert!(matches!(
            LegacyChecksumEncoding.decode_private(&wif),
            Err(Error::EncodingFailed(_))
        ));

        let mut tagged = DEV_TAGGED_PUBLIC.to_string();
        tagged.replace_range(12..13, "z");
        assert!(matches!(
            StructuredTypeTagEncoding.decode_public(&tagged),
            Err(Error::EncodingFailed(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_prefixes() {
        let codec = StructuredTypeTagEncoding;

        assert!(codec.decode_private(DEV_TAGGED_PUBLIC).is_err());
        assert!(codec.decode_public(DEV_TAGGED_PRIVATE).is_err());
        assert!(codec.decode_public("PUB_R1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63").is_err());
        assert!(codec.decode_public("PUB").is_err());
        assert!(LegacyChecksumEncoding.decode_public(DEV_TAGGED_PUBLIC).is_err());
        assert!(LegacyChecksumEncoding.decode_private(DEV_TAGGED_PRIVATE).is_err());
    }

    #[test]
    fn test_decoders_reject_wrong_payload_length() {
        // well-formed checksums around payloads of the wrong size
        let short_public = StructuredTypeTagEncoding::encode("PUB", KeyType::K1, &[2u8; 32]);
        assert!(matches!(
            StructuredTypeTagEncoding.decode_public(&short_public),
            Err(Error::EncodingFailed(_))
        ));

        let long_private = StructuredTypeTagEncoding::encode("PVT", KeyType::K1, &[1u8; 33]);
        assert!(matches!(
            StructuredTypeTagEncoding.decode_private(&long_private),
            Err(Error::EncodingFailed(_))
        ));

        let mut data = vec![2u8; 32];
        data.extend_from_slice(&ripemd160_checksum(&data, &[]));
        let short_legacy = format!("{}{}", LEGACY_PUBLIC_PREFIX, bs58::encode(data).into_string());
        assert!(matches!(
            LegacyChecksumEncoding.decode_public(&short_legacy),
            Err(Error::EncodingFailed(_))
        ));
    }
}
