//! Key deriver implementation

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DeriverConfig;
use crate::crypto::keys::codec::KeyCodec;
use crate::crypto::keys::extended::{self, ExtendedKey, MasterExtendedKeys};
use crate::crypto::keys::{DerivationPath, KeyPair, PublicKey};
use crate::crypto::mnemonic::{MnemonicStrength, Seed, SeedSource};
use crate::error::{Error, Result};

/// Address index of the owner permission key
pub const OWNER_KEY_INDEX: u32 = 0;

/// Address index of the active permission key
pub const ACTIVE_KEY_INDEX: u32 = 1;

/// A derived key pair rendered in the configured text format
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedKeys {
    pub private_key: String,
    pub public_key: String,
}

impl fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKeys")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Derives Antelope account keys from a single mnemonic.
///
/// Keys live at `m/44'/<coin_type>'/<account>'/<change>/<index>`. The seed is
/// stretched once and shared by clones of the deriver.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    seed_source: Arc<SeedSource>,
    config: DeriverConfig,
}

impl KeyDeriver {
    /// Create a deriver from an existing mnemonic with the default configuration
    pub fn from_phrase(phrase: &str) -> Result<Self> {
        Self::from_phrase_with_config(phrase, DeriverConfig::default())
    }

    /// Create a deriver from an existing mnemonic
    pub fn from_phrase_with_config(phrase: &str, config: DeriverConfig) -> Result<Self> {
        config.validate()?;
        let seed_source = SeedSource::from_phrase(phrase)?;
        Ok(Self { seed_source: Arc::new(seed_source), config })
    }

    /// Create a deriver around a freshly generated mnemonic
    pub fn generate(strength: MnemonicStrength, coin_type: u32) -> Result<Self> {
        Self::generate_with_config(strength, DeriverConfig::with_coin_type(coin_type))
    }

    /// Create a deriver around a freshly generated mnemonic
    pub fn generate_with_config(strength: MnemonicStrength, config: DeriverConfig) -> Result<Self> {
        config.validate()?;
        let seed_source = SeedSource::generate(strength)?;
        Ok(Self { seed_source: Arc::new(seed_source), config })
    }

    /// The mnemonic phrase
    pub fn words(&self) -> &str {
        self.seed_source.words()
    }

    pub fn config(&self) -> &DeriverConfig {
        &self.config
    }

    /// The codec selected by the configured key format
    pub fn codec(&self) -> &'static dyn KeyCodec {
        self.config.key_format.codec()
    }

    /// The 64-byte seed, stretched on first use
    pub fn seed(&self) -> &Seed {
        self.seed_source.seed()
    }

    /// Lowercase hex of the seed
    pub fn hex(&self) -> String {
        self.seed().to_hex()
    }

    /// Lowercase hex of the seed, stretching it on the blocking pool
    pub async fn hex_async(&self) -> Result<String> {
        let seed_source = Arc::clone(&self.seed_source);
        tokio::task::spawn_blocking(move || seed_source.seed().to_hex())
            .await
            .map_err(|e| Error::Runtime(format!("Seed derivation task failed: {}", e)))
    }

    /// `m/44'/<coin_type>'/<account>'/<change>/<index>`
    pub fn path(&self, index: u32, change: u32) -> Result<DerivationPath> {
        DerivationPath::bip44(self.config.coin_type, self.config.account, change, index)
    }

    /// `m/44'/<coin_type>'/<account>'/<change>`
    pub fn account_path(&self, change: u32) -> Result<DerivationPath> {
        DerivationPath::account_level(self.config.coin_type, self.config.account, change)
    }

    /// Derive the node at an arbitrary path
    pub fn derive_node(&self, path: &DerivationPath) -> Result<ExtendedKey> {
        extended::derive_node(self.seed(), path)
    }

    /// Derive the raw key pair at `index`
    pub fn derive_key_pair(&self, index: u32, change: u32) -> Result<KeyPair> {
        self.derive_node(&self.path(index, change)?)?.key_pair()
    }

    /// Derive the private key at `index` as text
    pub fn derive_private_key(&self, index: u32, change: u32) -> Result<String> {
        let key_pair = self.derive_key_pair(index, change)?;
        self.codec().encode_private(key_pair.private_key())
    }

    /// Derive the private and public key at `index` as text
    pub fn derive_keys(&self, index: u32, change: u32) -> Result<DerivedKeys> {
        let codec = self.codec();
        debug!(
            coin_type = self.config.coin_type,
            index,
            change,
            format = codec.name(),
            "deriving account keys"
        );

        let key_pair = self.derive_key_pair(index, change)?;
        Ok(DerivedKeys {
            private_key: codec.encode_private(key_pair.private_key())?,
            public_key: codec.encode_public(key_pair.public_key())?,
        })
    }

    /// Owner permission key (index 0, change 0)
    pub fn derive_owner_key(&self) -> Result<DerivedKeys> {
        self.derive_keys(OWNER_KEY_INDEX, 0)
    }

    /// Active permission key (index 1, change 0)
    pub fn derive_active_key(&self) -> Result<DerivedKeys> {
        self.derive_keys(ACTIVE_KEY_INDEX, 0)
    }

    /// Export the xprv/xpub pair one level above the address index
    pub fn derive_master_keys(&self, change: u32) -> Result<MasterExtendedKeys> {
        extended::export_master_extended_keys(self.seed(), &self.account_path(change)?)
    }

    /// Export only the xpub one level above the address index
    pub fn derive_master_public_key(&self, change: u32) -> Result<String> {
        Ok(self.derive_node(&self.account_path(change)?)?.to_extended_public_key())
    }

    /// Derive the public key at `index` below an exported xpub, without a mnemonic
    pub fn derive_from_master_public_key(extended_public_key: &str, index: u32) -> Result<PublicKey> {
        extended::derive_from_master_public_key(extended_public_key, index)
    }
}
