//! Key derivation and management
//!
//! This module provides derivation paths, extended keys and the key text
//! codecs used by Antelope chains.

pub mod codec;
pub mod extended;
pub mod path;
mod derivation;

pub use codec::{KeyCodec, LegacyChecksumEncoding, StructuredTypeTagEncoding};
pub use derivation::*;
pub use extended::{ExtendedKey, MasterExtendedKeys};
pub use path::{ChildNumber, DerivationPath};
