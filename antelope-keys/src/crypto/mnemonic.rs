//! Mnemonic phrase generation and seed derivation

use std::fmt;
use std::sync::OnceLock;

use bip39::Mnemonic;
use rand::{rngs::OsRng, RngCore};
use tracing::debug;

use crate::error::{Error, Result};

/// Length of a BIP39 seed in bytes
pub const SEED_LEN: usize = 64;

/// Supported mnemonic strengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnemonicStrength {
    /// 12 words (128 bits)
    Words12,
    /// 24 words (256 bits)
    Words24,
}

impl MnemonicStrength {
    /// Get entropy length in bytes
    fn entropy_bytes(&self) -> usize {
        match self {
            Self::Words12 => 16,
            Self::Words24 => 32,
        }
    }

    /// Select a strength from an entropy size in bits
    pub fn from_bits(bits: usize) -> Result<Self> {
        match bits {
            128 => Ok(Self::Words12),
            256 => Ok(Self::Words24),
            other => Err(Error::InvalidMnemonic(format!(
                "unsupported entropy size: {} bits (expected 128 or 256)",
                other
            ))),
        }
    }

    /// Number of words a mnemonic of this strength contains
    pub fn word_count(&self) -> usize {
        match self {
            Self::Words12 => 12,
            Self::Words24 => 24,
        }
    }
}

/// Generate a new random mnemonic phrase with the specified strength
pub fn generate_mnemonic(strength: MnemonicStrength) -> Result<String> {
    Ok(random_mnemonic(strength)?.to_string())
}

fn random_mnemonic(strength: MnemonicStrength) -> Result<Mnemonic> {
    let mut entropy = [0u8; 32];
    let entropy = &mut entropy[..strength.entropy_bytes()];
    OsRng.fill_bytes(entropy);

    let mnemonic = Mnemonic::from_entropy(entropy)
        .map_err(|e| Error::InvalidMnemonic(e.to_string()));
    entropy.fill(0);
    mnemonic
}

/// Check a mnemonic phrase against the wordlist and its embedded checksum
pub fn validate_mnemonic(phrase: &str) -> bool {
    Mnemonic::parse_normalized(phrase).is_ok()
}

/// Stretch a mnemonic phrase into its 64-byte seed (empty passphrase)
pub fn mnemonic_to_seed(phrase: &str) -> Result<Seed> {
    let mnemonic = Mnemonic::parse_normalized(phrase)
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;

    Ok(Seed(mnemonic.to_seed_normalized("")))
}

/// A 64-byte BIP39 seed
#[derive(Clone, PartialEq, Eq)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    /// Wrap raw seed bytes
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw seed bytes
    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }

    /// Lowercase hex encoding of the seed
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}

/// Owns a validated mnemonic and lazily computes its seed.
///
/// The seed is stretched at most once per instance. Reads after the first
/// computation are lock-free, so a `SeedSource` can be shared across threads.
#[derive(Clone)]
pub struct SeedSource {
    mnemonic: Mnemonic,
    phrase: String,
    seed: OnceLock<Seed>,
}

impl SeedSource {
    /// Create a seed source from an existing phrase
    pub fn from_phrase(phrase: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_normalized(phrase)
            .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;

        Ok(Self::from_mnemonic(mnemonic))
    }

    /// Create a seed source from a freshly generated mnemonic
    pub fn generate(strength: MnemonicStrength) -> Result<Self> {
        let mnemonic = random_mnemonic(strength)?;
        debug!(words = strength.word_count(), "generated new mnemonic");
        Ok(Self::from_mnemonic(mnemonic))
    }

    fn from_mnemonic(mnemonic: Mnemonic) -> Self {
        let phrase = mnemonic.to_string();
        Self { mnemonic, phrase, seed: OnceLock::new() }
    }

    /// Check a phrase without constructing a seed source
    pub fn validate(phrase: &str) -> bool {
        validate_mnemonic(phrase)
    }

    /// The canonical, single-space separated phrase
    pub fn words(&self) -> &str {
        &self.phrase
    }

    /// Number of words in the phrase
    pub fn word_count(&self) -> usize {
        self.mnemonic.word_count()
    }

    /// The seed for this mnemonic, computed on first access
    pub fn seed(&self) -> &Seed {
        self.seed.get_or_init(|| {
            debug!("stretching mnemonic into seed");
            Seed(self.mnemonic.to_seed_normalized(""))
        })
    }
}

impl fmt::Debug for SeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedSource")
            .field("word_count", &self.word_count())
            .field("seed_cached", &self.seed.get().is_some())
            .finish()
    }
}
