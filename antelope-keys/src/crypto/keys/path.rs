//! BIP32 derivation paths

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// First hardened child index (2^31)
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// BIP44 purpose field
pub const BIP44_PURPOSE: u32 = 44;

/// SLIP-44 coin type registered for EOS / Antelope
pub const ANTELOPE_COIN_TYPE: u32 = 194;

/// A single step of a derivation path
///
/// The index is kept below 2^31 by every constructor, so the hardened flag is
/// the only source of the top bit in [`ChildNumber::to_u32`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildNumber {
    index: u32,
    hardened: bool,
}

impl ChildNumber {
    /// Child number of a master node
    pub(crate) const ZERO: Self = Self { index: 0, hardened: false };

    /// Create a non-hardened child number, rejecting indexes >= 2^31
    pub fn normal(index: u32) -> Result<Self> {
        check_index(index)?;
        Ok(Self { index, hardened: false })
    }

    /// Create a hardened child number, rejecting indexes >= 2^31
    pub fn hardened(index: u32) -> Result<Self> {
        check_index(index)?;
        Ok(Self { index, hardened: true })
    }

    /// The 31-bit index without the hardened bit
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_hardened(&self) -> bool {
        self.hardened
    }

    /// The 32-bit value fed into child key derivation
    pub fn to_u32(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }
}

impl From<u32> for ChildNumber {
    /// Split a serialized child number; the top bit selects hardened
    fn from(value: u32) -> Self {
        Self {
            index: value & !HARDENED_OFFSET,
            hardened: value & HARDENED_OFFSET != 0,
        }
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

impl FromStr for ChildNumber {
    type Err = Error;

    fn from_str(component: &str) -> Result<Self> {
        let (digits, hardened) = match component.strip_suffix(&['\'', 'h', 'H'][..]) {
            Some(digits) => (digits, true),
            None => (component, false),
        };

        // u32::from_str would accept a leading '+'
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPath(format!(
                "Invalid derivation path component: {:?}",
                component
            )));
        }

        let index = digits.parse::<u32>().map_err(|_| {
            Error::InvalidPath(format!("Derivation path component out of range: {}", component))
        })?;

        if hardened {
            Self::hardened(index)
        } else {
            Self::normal(index)
        }
    }
}

fn check_index(index: u32) -> Result<()> {
    if index >= HARDENED_OFFSET {
        return Err(Error::InvalidPath(format!(
            "Child index {} does not fit in 31 bits",
            index
        )));
    }
    Ok(())
}

/// An ordered list of child derivation steps starting at the master node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    /// The empty path, addressing the master node itself
    pub fn master() -> Self {
        Self(Vec::new())
    }

    /// `m/44'/<coin_type>'/<account>'/<change>/<index>`
    pub fn bip44(coin_type: u32, account: u32, change: u32, index: u32) -> Result<Self> {
        let mut path = Self::account_level(coin_type, account, change)?;
        path.0.push(ChildNumber::normal(index)?);
        Ok(path)
    }

    /// `m/44'/<coin_type>'/<account>'/<change>`, the last node whose children
    /// are reachable from its extended public key alone
    pub fn account_level(coin_type: u32, account: u32, change: u32) -> Result<Self> {
        Ok(Self(vec![
            ChildNumber::hardened(BIP44_PURPOSE)?,
            ChildNumber::hardened(coin_type)?,
            ChildNumber::hardened(account)?,
            ChildNumber::normal(change)?,
        ]))
    }

    /// Append one step, returning the extended path
    pub fn child(&self, child: ChildNumber) -> Self {
        let mut steps = self.0.clone();
        steps.push(child);
        Self(steps)
    }

    pub fn as_slice(&self) -> &[ChildNumber] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any step requires private key material
    pub fn has_hardened(&self) -> bool {
        self.0.iter().any(ChildNumber::is_hardened)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChildNumber> {
        self.0.iter()
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(steps: Vec<ChildNumber>) -> Self {
        Self(steps)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for child in &self.0 {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    /// Parse `m/44'/194'/0'/0/0` style paths
    fn from_str(path: &str) -> Result<Self> {
        let mut components = path.split('/');

        match components.next() {
            Some("m") | Some("M") => {}
            _ => {
                return Err(Error::InvalidPath(format!(
                    "Derivation path must start with 'm': {}",
                    path
                )))
            }
        }

        let steps = components
            .map(ChildNumber::from_str)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self(steps))
    }
}
