//! CCSDS Transport File (TP_File) — reassembled from a FIRST/CONTINUE*/LAST
//! run of CP_PDUs (spec.md §3, §4.5.3).

use super::bits::get_bits_u64;

/// Size of the TP_File header in bytes.
pub const HEADER_LEN: usize = 10;

pub struct TpFile {
    /// File counter from the 10-byte header.
    pub counter: u16,
    /// Declared payload length in bytes (the header stores bits).
    pub length: u64,
    pub payload: Vec<u8>,
}

impl TpFile {
    /// Starts a new TP_File from a CP_PDU FIRST/SINGLE payload (CRC already
    /// stripped by the caller). Returns `None` if `data` is too short to
    /// hold the 10-byte header — a malformed frame to be logged and dropped
    /// by the caller, not a reason to panic.
    pub fn new(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN {
            return None;
        }
        let header = &data[..HEADER_LEN];

        let counter = get_bits_u64(header, 0, 16) as u16;
        let length_bits = get_bits_u64(header, 16, 64);

        Some(TpFile {
            counter,
            length: length_bits / 8,
            payload: data[HEADER_LEN..].to_vec(),
        })
    }

    pub fn append(&mut self, data: &[u8]) {
        self.payload.extend_from_slice(data);
    }

    /// Appends the final chunk and checks the accumulated payload length
    /// against the declared length.
    pub fn finish(&mut self, data: &[u8]) -> bool {
        self.append(data);
        self.payload.len() as u64 == self.length
    }

    pub fn is_complete(&self) -> bool {
        self.payload.len() as u64 == self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_header(counter: u16, length_bytes: u64) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[..2].copy_from_slice(&counter.to_be_bytes());
        header[2..].copy_from_slice(&(length_bytes * 8).to_be_bytes());
        header
    }

    #[test]
    fn parses_header_and_payload() {
        let header = build_header(42, 5);
        let mut data = header.to_vec();
        data.extend_from_slice(b"hello");

        let tpfile = TpFile::new(&data).unwrap();
        assert_eq!(tpfile.counter, 42);
        assert_eq!(tpfile.length, 5);
        assert_eq!(tpfile.payload, b"hello");
        assert!(tpfile.is_complete());
    }

    #[test]
    fn append_and_finish_checks_length() {
        let header = build_header(1, 11);
        let mut data = header.to_vec();
        data.extend_from_slice(b"hello ");

        let mut tpfile = TpFile::new(&data).unwrap();
        assert!(!tpfile.is_complete());
        assert!(tpfile.finish(b"world"));
        assert_eq!(tpfile.payload, b"hello world");
    }

    #[test]
    fn undersized_data_returns_none() {
        let data = vec![0u8; HEADER_LEN - 1];
        assert!(TpFile::new(&data).is_none());
    }

    #[test]
    fn length_mismatch_detected() {
        let header = build_header(1, 100);
        let mut data = header.to_vec();
        data.extend_from_slice(b"short");

        let mut tpfile = TpFile::new(&data).unwrap();
        assert!(!tpfile.finish(b""));
    }
}
