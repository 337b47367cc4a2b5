//! Cryptographic primitives and operations
//!
//! This module provides mnemonic handling, BIP32 key derivation and the
//! chain-specific key encodings.

pub mod mnemonic;
pub mod keys;

pub use mnemonic::*;
pub use keys::*;
