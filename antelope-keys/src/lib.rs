//! Antelope Keys - hierarchical key derivation for Antelope/EOSIO accounts
//!
//! This library turns a BIP39 mnemonic phrase into a BIP32 tree of secp256k1
//! key pairs along `m/44'/194'/0'/<change>/<index>` and renders the keys in
//! the chain's text formats, either the legacy WIF/`EOS` form or the
//! type-tagged `PVT_K1_`/`PUB_K1_` form.

pub mod error;
pub mod config;
pub mod crypto;
pub mod account;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use config::{DeriverConfig, KeyFormat};
pub use account::{DerivedKeys, KeyDeriver};
pub use crypto::keys::{DerivationPath, ExtendedKey, KeyPair, MasterExtendedKeys, PrivateKey, PublicKey};
pub use crypto::mnemonic::{MnemonicStrength, Seed, SeedSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
