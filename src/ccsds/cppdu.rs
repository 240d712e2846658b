//! CCSDS Path Protocol Data Unit (CP_PDU) — the variable-length packet the
//! upper layer cares about, fragmented across M_PDUs (spec.md §3, §4.5.2).

use super::bits::get_bits_u64;
use super::crc;

/// Size of a fully-present CP_PDU header in bytes.
pub const HEADER_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Continue,
    First,
    Last,
    Single,
}

impl Sequence {
    fn from_bits(value: u64) -> Self {
        match value {
            0 => Sequence::Continue,
            1 => Sequence::First,
            2 => Sequence::Last,
            3 => Sequence::Single,
            _ => unreachable!("2-bit field can only take values 0..=3"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CpPduHeader {
    pub version: u8,
    pub pdu_type: u8,
    pub secondary_header_flag: bool,
    pub apid: u16,
    pub seq: Sequence,
    pub counter: u16,
    /// True payload length in bytes (the on-wire field stores length - 1).
    pub length: u32,
}

fn parse_header(bytes: &[u8; HEADER_LEN]) -> CpPduHeader {
    CpPduHeader {
        version: get_bits_u64(bytes, 0, 3) as u8,
        pdu_type: get_bits_u64(bytes, 3, 1) as u8,
        secondary_header_flag: get_bits_u64(bytes, 4, 1) != 0,
        apid: get_bits_u64(bytes, 5, 11) as u16,
        seq: Sequence::from_bits(get_bits_u64(bytes, 16, 2)),
        counter: get_bits_u64(bytes, 18, 14) as u16,
        length: get_bits_u64(bytes, 32, 16) as u32 + 1,
    }
}

/// A CP_PDU being reassembled across one or more M_PDUs.
///
/// Tracks the three in-flight states named in spec.md §9: header-incomplete
/// (fewer than 6 header bytes seen), header-parsed/payload-growing, and
/// payload-complete (reached via [`CpPdu::finish`]).
pub struct CpPdu {
    header_buf: Vec<u8>,
    pub header: Option<CpPduHeader>,
    pub payload: Vec<u8>,
}

impl CpPdu {
    /// Starts a new CP_PDU from the bytes available at its header offset.
    /// If fewer than 6 bytes are available, the header is left incomplete
    /// and parsing is deferred until [`CpPdu::append`] supplies the rest.
    pub fn new(data: &[u8]) -> Self {
        if data.len() >= HEADER_LEN {
            let mut header_bytes = [0u8; HEADER_LEN];
            header_bytes.copy_from_slice(&data[..HEADER_LEN]);
            CpPdu {
                header_buf: data[..HEADER_LEN].to_vec(),
                header: Some(parse_header(&header_bytes)),
                payload: data[HEADER_LEN..].to_vec(),
            }
        } else {
            CpPdu {
                header_buf: data.to_vec(),
                header: None,
                payload: Vec::new(),
            }
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.header.is_some()
    }

    /// Appends more reassembly data. If the header was still incomplete,
    /// completes it first and routes the remaining bytes to the payload.
    pub fn append(&mut self, data: &[u8]) {
        if self.header.is_none() {
            let remaining = HEADER_LEN - self.header_buf.len();
            let take = remaining.min(data.len());
            self.header_buf.extend_from_slice(&data[..take]);

            if self.header_buf.len() == HEADER_LEN {
                let mut header_bytes = [0u8; HEADER_LEN];
                header_bytes.copy_from_slice(&self.header_buf);
                self.header = Some(parse_header(&header_bytes));
                self.payload.extend_from_slice(&data[take..]);
            }
        } else {
            self.payload.extend_from_slice(data);
        }
    }

    /// Truncates the payload to `len` bytes, discarding M_PDU-level padding
    /// for the short-packet special case (spec.md §4.5.2 step 3).
    pub fn truncate_payload(&mut self, len: usize) {
        self.payload.truncate(len);
    }

    /// Appends a final chunk of data and checks the declared length and
    /// trailing CRC-16/CCITT-FALSE. Both checks are recorded but neither
    /// prevents the CP_PDU from being handed to the assembler — the caller
    /// decides what to do with a failing PDU (spec.md §4.5.2 step 1).
    ///
    /// Returns `None` if the header is still incomplete even after `data`
    /// is appended — the CP_PDU has no declared length to check against,
    /// the Rust analogue of the original's `AttributeError` ("no CP_PDU to
    /// finish", spec.md §7).
    pub fn finish(&mut self, data: &[u8]) -> Option<(bool, bool)> {
        self.append(data);
        let header = self.header?;

        let len_ok = self.payload.len() as u32 == header.length;
        let crc_ok = crc::verify(&self.payload);

        Some((len_ok, crc_ok))
    }

    /// Checks whether this CP_PDU is the synthetic EOF marker that closes a
    /// TP_File: APID=0, counter=0, SEQ=CONTINUE, length=1 (spec.md §3).
    pub fn is_eof(&self) -> bool {
        match self.header {
            Some(h) => h.apid == 0 && h.counter == 0 && h.length == 1 && h.seq == Sequence::Continue,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_cppdu_bytes(apid: u16, seq: Sequence, counter: u16, payload: &[u8]) -> Vec<u8> {
        let seq_bits: u64 = match seq {
            Sequence::Continue => 0,
            Sequence::First => 1,
            Sequence::Last => 2,
            Sequence::Single => 3,
        };
        let length_field = (payload.len() as u64) - 1;

        let mut header: u64 = 0;
        header |= 0u64 << 45; // version
        header |= 0u64 << 44; // type
        header |= 0u64 << 43; // secondary header flag
        header |= (apid as u64 & 0x7FF) << 32;
        header |= seq_bits << 30;
        header |= (counter as u64 & 0x3FFF) << 16;
        header |= length_field & 0xFFFF;

        let mut bytes = header.to_be_bytes()[2..].to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    fn payload_with_crc(data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        let crc = crc::checksum(data);
        out.extend_from_slice(&crc.to_be_bytes());
        out
    }

    #[test]
    fn parses_complete_header_in_one_shot() {
        let payload = payload_with_crc(b"hello");
        let bytes = build_cppdu_bytes(42, Sequence::Single, 7, &payload);

        let cppdu = CpPdu::new(&bytes);
        assert!(cppdu.is_parsed());
        let header = cppdu.header.unwrap();
        assert_eq!(header.apid, 42);
        assert_eq!(header.seq, Sequence::Single);
        assert_eq!(header.counter, 7);
        assert_eq!(header.length as usize, payload.len());
        assert_eq!(cppdu.payload, payload);
    }

    #[test]
    fn header_straddling_mpdu_boundary() {
        let payload = payload_with_crc(b"split header test");
        let bytes = build_cppdu_bytes(1, Sequence::First, 0, &payload);

        // Split so the header (6 bytes) straddles two appends.
        let (first, rest) = bytes.split_at(4);
        let mut cppdu = CpPdu::new(first);
        assert!(!cppdu.is_parsed());

        cppdu.append(rest);
        assert!(cppdu.is_parsed());
        assert_eq!(cppdu.payload, payload);
    }

    #[test]
    fn finish_reports_length_and_crc_ok() {
        let payload = payload_with_crc(b"abc");
        let bytes = build_cppdu_bytes(5, Sequence::Single, 1, &payload);
        let mut cppdu = CpPdu::new(&bytes);

        let (len_ok, crc_ok) = cppdu.finish(&[]).unwrap();
        assert!(len_ok);
        assert!(crc_ok);
    }

    #[test]
    fn finish_detects_crc_mismatch_without_dropping_result() {
        let mut payload = payload_with_crc(b"abc");
        let last = payload.len() - 1;
        payload[last] ^= 0xFF;
        let bytes = build_cppdu_bytes(5, Sequence::Single, 1, &payload);
        let mut cppdu = CpPdu::new(&bytes);

        let (len_ok, crc_ok) = cppdu.finish(&[]).unwrap();
        assert!(len_ok);
        assert!(!crc_ok);
    }

    #[test]
    fn eof_marker_detected() {
        let payload = vec![0u8]; // length field 1
        let bytes = build_cppdu_bytes(0, Sequence::Continue, 0, &payload);
        let cppdu = CpPdu::new(&bytes);
        assert!(cppdu.is_eof());
    }

    #[test]
    fn truncate_discards_mpdu_padding() {
        let payload = payload_with_crc(b"abc");
        let mut bytes = build_cppdu_bytes(5, Sequence::Single, 1, &payload);
        bytes.extend_from_slice(&[0u8; 20]); // M_PDU padding
        let mut cppdu = CpPdu::new(&bytes);

        cppdu.truncate_payload(payload.len());
        let (len_ok, crc_ok) = cppdu.finish(&[]).unwrap();
        assert!(len_ok);
        assert!(crc_ok);
    }
}
