//! CCSDS protocol stack: VCDU -> M_PDU -> CP_PDU -> TP_File -> S_PDU -> xRIT.

pub mod bits;
pub mod cppdu;
pub mod crc;
pub mod mpdu;
pub mod spdu;
pub mod tpfile;
pub mod vcdu;
pub mod xrit;

pub use cppdu::{CpPdu, CpPduHeader, Sequence};
pub use mpdu::MPdu;
pub use spdu::{SPdu, SpduError};
pub use tpfile::TpFile;
pub use vcdu::Vcdu;
pub use xrit::{FileNameParts, FileType, XritError, XritFile};

use thiserror::Error;

/// Errors surfaced by the demultiplexer's protocol layers. None of these
/// are fatal to the process — the caller logs and drops the affected
/// reassembly, continuing the stream (spec.md §7).
#[derive(Debug, Error)]
pub enum CcsdsError {
    #[error(transparent)]
    Spdu(#[from] SpduError),
    #[error(transparent)]
    Xrit(#[from] XritError),
    #[error("TP_File length mismatch: expected {expected} bytes, got {actual}")]
    TpFileLengthMismatch { expected: u64, actual: usize },
    #[error("CP_PDU CRC check failed for APID {apid}")]
    CpPduCrcMismatch { apid: u16 },
}
