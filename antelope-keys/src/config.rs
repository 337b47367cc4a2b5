//! Deriver configuration

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::keys::codec::{KeyCodec, LegacyChecksumEncoding, StructuredTypeTagEncoding};
use crate::crypto::keys::path::{ANTELOPE_COIN_TYPE, HARDENED_OFFSET};
use crate::error::{Error, Result};

/// Text format used for derived keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    /// WIF private keys and `EOS…` public keys
    Legacy,
    /// `PVT_K1_…` and `PUB_K1_…`
    #[default]
    Structured,
}

impl KeyFormat {
    /// The codec implementing this format
    pub fn codec(&self) -> &'static dyn KeyCodec {
        match self {
            Self::Legacy => &LegacyChecksumEncoding,
            Self::Structured => &StructuredTypeTagEncoding,
        }
    }
}

impl FromStr for KeyFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "wif" => Ok(Self::Legacy),
            "structured" | "k1" => Ok(Self::Structured),
            other => Err(Error::Config(format!("Unknown key format: {}", other))),
        }
    }
}

/// Key deriver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeriverConfig {
    /// SLIP-44 coin type, the second path segment
    pub coin_type: u32,
    /// Hardened account segment
    pub account: u32,
    /// Output text format
    pub key_format: KeyFormat,
}

impl Default for DeriverConfig {
    fn default() -> Self {
        Self {
            coin_type: ANTELOPE_COIN_TYPE,
            account: 0,
            key_format: KeyFormat::default(),
        }
    }
}

impl DeriverConfig {
    /// Default configuration with a different coin type
    pub fn with_coin_type(coin_type: u32) -> Self {
        Self { coin_type, ..Self::default() }
    }

    /// Create configuration from environment variables
    ///
    /// Reads `ANTELOPE_COIN_TYPE`, `ANTELOPE_ACCOUNT` and `ANTELOPE_KEY_FORMAT`.
    /// Unset variables keep their defaults; unparseable ones are an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let coin_type = match std::env::var("ANTELOPE_COIN_TYPE") {
            Ok(value) => parse_index("ANTELOPE_COIN_TYPE", &value)?,
            Err(_) => defaults.coin_type,
        };
        let account = match std::env::var("ANTELOPE_ACCOUNT") {
            Ok(value) => parse_index("ANTELOPE_ACCOUNT", &value)?,
            Err(_) => defaults.account,
        };
        let key_format = match std::env::var("ANTELOPE_KEY_FORMAT") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.key_format,
        };

        let config = Self { coin_type, account, key_format };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON document; missing fields use defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid configuration JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Coin type and account are hardened segments and must fit in 31 bits
    pub fn validate(&self) -> Result<()> {
        if self.coin_type >= HARDENED_OFFSET {
            return Err(Error::Config(format!("Coin type {} out of range", self.coin_type)));
        }
        if self.account >= HARDENED_OFFSET {
            return Err(Error::Config(format!("Account {} out of range", self.account)));
        }
        Ok(())
    }
}

fn parse_index(name: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|e| Error::Config(format!("{}={:?}: {}", name, value, e)))
}
