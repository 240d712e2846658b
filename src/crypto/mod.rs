//! Symmetric-key primitives: DES-ECB block cipher and the decryption key table.

pub mod des;
pub mod keys;

pub use keys::{KeyTable, KeyTableError};
