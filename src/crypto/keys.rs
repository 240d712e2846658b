//! Decryption key table.
//!
//! Immutable mapping from 16-bit key index to 8-byte DES key, loaded once at
//! startup (spec.md §3 "Key table"). Absence or an empty table disables
//! decryption; encrypted files are then passed through untouched.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyTableError {
    #[error("failed to read key file: {0}")]
    Io(#[from] std::io::Error),
    #[error("key file truncated while reading key {0}")]
    Truncated(usize),
}

/// Key-index -> 8-byte DES key.
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    keys: HashMap<u16, [u8; 8]>,
}

impl KeyTable {
    pub fn empty() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    /// Parses `[u16 count][(u16 index, 8-byte key) * count]` (spec.md §6).
    pub fn from_bytes(data: &[u8]) -> Result<Self, KeyTableError> {
        let mut keys = HashMap::new();
        if data.len() < 2 {
            return Ok(Self { keys });
        }

        let count = u16::from_be_bytes([data[0], data[1]]) as usize;
        let mut offset = 2;
        for i in 0..count {
            if offset + 10 > data.len() {
                return Err(KeyTableError::Truncated(i));
            }
            let index = u16::from_be_bytes([data[offset], data[offset + 1]]);
            let mut key = [0u8; 8];
            key.copy_from_slice(&data[offset + 2..offset + 10]);
            keys.insert(index, key);
            offset += 10;
        }

        Ok(Self { keys })
    }

    /// Loads the key file from disk. A missing file disables decryption
    /// (returns an empty table) rather than erroring, matching the
    /// original's "Encrypted xRIT files will be saved to disk" behaviour.
    pub fn load(path: &Path) -> Result<Self, KeyTableError> {
        if !path.is_file() {
            return Ok(Self::empty());
        }
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, index: u16) -> Option<&[u8; 8]> {
        self.keys.get(&index)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> Vec<u8> {
        let mut buf = vec![0x00, 0x02]; // 2 keys
        buf.extend_from_slice(&7u16.to_be_bytes());
        buf.extend_from_slice(&[0xAA; 8]);
        buf.extend_from_slice(&9u16.to_be_bytes());
        buf.extend_from_slice(&[0xBB; 8]);
        buf
    }

    #[test]
    fn parses_key_table() {
        let table = KeyTable::from_bytes(&sample_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(7), Some(&[0xAA; 8]));
        assert_eq!(table.get(9), Some(&[0xBB; 8]));
        assert_eq!(table.get(1), None);
    }

    #[test]
    fn truncated_table_errors() {
        let mut buf = sample_bytes();
        buf.truncate(buf.len() - 1);
        assert!(KeyTable::from_bytes(&buf).is_err());
    }

    #[test]
    fn missing_file_disables_decryption() {
        let table = KeyTable::load(Path::new("/nonexistent/path/keys.bin")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn empty_bytes_give_empty_table() {
        let table = KeyTable::from_bytes(&[]).unwrap();
        assert!(table.is_empty());
    }
}
