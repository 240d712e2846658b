//! Product assembler: turns a stream of xRIT files into named artifacts on
//! disk (spec.md §4.7).

pub mod multi_segment;
pub mod single_segment;
pub mod text;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ccsds::XritFile;
use crate::config::{Downlink, Spacecraft};
use crate::raster::Decoder;

pub use multi_segment::MultiSegmentImage;
pub use single_segment::SingleSegmentImage;
pub use text::AlphanumericText;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("xRIT file name {0:?} does not match the product naming grammar")]
    BadFileName(String),
    #[error("failed to create output directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Components common to every product's canonical file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductName {
    pub kind: String,
    pub mode: String,
    pub sequence: u32,
    pub date: String,
    pub time: String,
    /// Full canonical name without its two-digit segment suffix or extension,
    /// with the channel replaced by `<CHANNEL>` for multi-channel HRIT images.
    pub full: String,
}

impl ProductName {
    fn parse(file_name: &str, downlink: Downlink) -> Result<Self, ProductError> {
        let parts: Vec<&str> = file_name.split('_').collect();
        let stem = file_name
            .split('.')
            .next()
            .ok_or_else(|| ProductError::BadFileName(file_name.to_string()))?;

        if parts.first() == Some(&"IMG") {
            if parts.len() < 7 {
                return Err(ProductError::BadFileName(file_name.to_string()));
            }
            let full = if downlink == Downlink::Hrit {
                let mut generalised = parts.clone();
                generalised[3] = "<CHANNEL>";
                let joined = generalised.join("_");
                truncate_segment_suffix(&joined)
            } else {
                truncate_segment_suffix(stem)
            };

            Ok(ProductName {
                kind: parts[0].to_string(),
                mode: parts[1].to_string(),
                sequence: parts[2].parse().map_err(|_| ProductError::BadFileName(file_name.to_string()))?,
                date: parts[4].to_string(),
                time: parts[5].to_string(),
                full,
            })
        } else if parts.len() >= 6 {
            Ok(ProductName {
                kind: parts[0].to_string(),
                mode: parts[1].to_string(),
                sequence: parts[2].parse().map_err(|_| ProductError::BadFileName(file_name.to_string()))?,
                date: parts[3].to_string(),
                time: parts[4].to_string(),
                full: truncate_segment_suffix(stem),
            })
        } else {
            Err(ProductError::BadFileName(file_name.to_string()))
        }
    }

    /// `<output_root>/<downlink>/<YYYYMMDD>/<mode>/` (spec.md §4.7).
    pub fn output_dir(&self, root: &Path, downlink: Downlink) -> PathBuf {
        root.join(downlink.as_str()).join(&self.date).join(&self.mode)
    }
}

/// Strips the trailing `_NN` segment suffix (two digits) a stem carries.
fn truncate_segment_suffix(stem: &str) -> String {
    if stem.len() >= 3 && stem.as_bytes()[stem.len() - 3] == b'_' {
        stem[..stem.len() - 3].to_string()
    } else {
        stem.to_string()
    }
}

/// Common operations over the three product variants (spec.md §9 "tagged union").
pub trait Product: Send {
    fn name(&self) -> &ProductName;
    fn add(&mut self, xrit: &XritFile) -> Result<(), ProductError>;
    fn is_complete(&self) -> bool;
    fn save(&self, root: &Path) -> Result<PathBuf, ProductError>;
}

/// Dispatches to the product variant for (spacecraft, downlink, mode)
/// (spec.md §4.7 dispatch table).
pub fn new(
    spacecraft: Spacecraft,
    downlink: Downlink,
    decoder: std::sync::Arc<dyn Decoder>,
    file_name: &str,
) -> Result<Box<dyn Product>, ProductError> {
    let mode = file_name
        .split('_')
        .nth(1)
        .ok_or_else(|| ProductError::BadFileName(file_name.to_string()))?;

    let name = ProductName::parse(file_name, downlink)?;

    match (spacecraft, downlink, mode) {
        (Spacecraft::Gk2a, Downlink::Lrit, "FD") => {
            Ok(Box::new(MultiSegmentImage::new(name, downlink, decoder)))
        }
        (Spacecraft::Gk2a, Downlink::Hrit, "FD") => {
            Ok(Box::new(MultiSegmentImage::new(name, downlink, decoder)))
        }
        (Spacecraft::Gk2a, Downlink::Lrit, "ANT") => Ok(Box::new(AlphanumericText::new(name, downlink))),
        _ => Ok(Box::new(SingleSegmentImage::new(name, downlink))),
    }
}
