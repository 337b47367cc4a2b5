//! Account key management
//!
//! This module provides the `KeyDeriver` façade that produces owner, active
//! and arbitrary-index keys for an Antelope account from one mnemonic.

mod deriver;

pub use deriver::*;
