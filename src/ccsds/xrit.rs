//! xRIT file — the fully reassembled and decrypted product of a TP_File,
//! with its own header-field TLV chain giving the file its name
//! (spec.md §3, §4.7).

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XritError {
    #[error("xRIT primary header is truncated")]
    Truncated,
    #[error("annotation text header (type 4) not found")]
    MissingFileName,
    #[error("annotation text header is not valid UTF-8")]
    InvalidFileName(#[from] std::str::Utf8Error),
    #[error("file name {0:?} does not match the IMG_/ADD_ naming grammar")]
    UnrecognisedFileName(String),
    #[error("file name {0:?} has an invalid observation date/time")]
    BadTimestamp(String),
}

const ANNOTATION_TEXT_HEADER_TYPE: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    ImageData,
    GtsMessage,
    AlphanumericText,
    EncryptionKeyMessage,
    AdditionalData,
    Unknown(u8),
}

impl FileType {
    fn from_code(code: u8) -> Self {
        match code {
            0 => FileType::ImageData,
            1 => FileType::GtsMessage,
            2 => FileType::AlphanumericText,
            3 => FileType::EncryptionKeyMessage,
            255 => FileType::AdditionalData,
            other => FileType::Unknown(other),
        }
    }
}

/// Components parsed out of an `IMG_*` or `ADD_*` file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameParts {
    pub observation_mode: String,
    pub sequence_number: String,
    /// Spectral channel, only present for `IMG_*` names.
    pub channel: Option<String>,
    pub date: String,
    pub time: String,
    pub segment_number: String,
    pub extension: String,
}

pub struct XritFile {
    pub data: Vec<u8>,
    pub file_type: FileType,
    pub total_header_length: u32,
    pub data_length: u64,
    pub file_name: String,
}

impl XritFile {
    /// Parses the primary header and walks the header-field chain to find
    /// the file name (annotation text header, type 4).
    pub fn parse(data: Vec<u8>) -> Result<Self, XritError> {
        if data.len() < 16 {
            return Err(XritError::Truncated);
        }

        let header_len = u16::from_be_bytes([data[1], data[2]]) as usize;
        let file_type = FileType::from_code(data[3]);
        let total_header_length = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let data_length = u64::from_be_bytes([
            data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
        ]);
        let _ = header_len;

        let mut offset = 16usize;
        let annotation_offset = loop {
            if offset + 3 > data.len() {
                return Err(XritError::MissingFileName);
            }
            let header_type = data[offset];
            let entry_len = u16::from_be_bytes([data[offset + 1], data[offset + 2]]) as usize;
            if header_type == ANNOTATION_TEXT_HEADER_TYPE {
                break offset;
            }
            if entry_len == 0 {
                return Err(XritError::MissingFileName);
            }
            offset += entry_len;
        };

        let entry_len = u16::from_be_bytes([
            data[annotation_offset + 1],
            data[annotation_offset + 2],
        ]) as usize;
        let name_bytes = &data[annotation_offset + 3..annotation_offset + entry_len];
        let file_name = std::str::from_utf8(name_bytes)?.to_string();

        Ok(XritFile {
            data,
            file_type,
            total_header_length,
            data_length,
            file_name,
        })
    }

    /// The xRIT data field, sliced out of the reassembled file using the
    /// total header length recorded in the primary header.
    pub fn data_field(&self) -> &[u8] {
        let start = self.total_header_length as usize;
        let end = start + self.data_length as usize;
        &self.data[start..end]
    }

    /// Splits `self.file_name` by the IMG_/ADD_ naming grammar (spec.md §4.7).
    pub fn name_parts(&self) -> Result<FileNameParts, XritError> {
        let fields: Vec<&str> = self.file_name.split('_').collect();
        let extension = self
            .file_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string();

        let parts = match fields.first().copied() {
            Some("IMG") if fields.len() >= 7 => FileNameParts {
                observation_mode: fields[1].to_string(),
                sequence_number: fields[2].to_string(),
                channel: Some(fields[3].to_string()),
                date: fields[4].to_string(),
                time: fields[5].to_string(),
                segment_number: fields[6][..2.min(fields[6].len())].to_string(),
                extension,
            },
            Some("ADD") if fields.len() >= 6 => FileNameParts {
                observation_mode: fields[1].to_string(),
                sequence_number: fields[2].to_string(),
                channel: None,
                date: fields[3].to_string(),
                time: fields[4].to_string(),
                segment_number: fields[5][..2.min(fields[5].len())].to_string(),
                extension,
            },
            _ => return Err(XritError::UnrecognisedFileName(self.file_name.clone())),
        };

        if NaiveDate::parse_from_str(&parts.date, "%Y%m%d").is_err()
            || NaiveTime::parse_from_str(&parts.time, "%H%M%S").is_err()
        {
            return Err(XritError::BadTimestamp(self.file_name.clone()));
        }

        Ok(parts)
    }
}
