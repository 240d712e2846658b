//! Raster decoding boundary.
//!
//! Decoding an individual image segment is treated as an external
//! collaborator: the product assembler only needs a byte slice turned into
//! a 2-D pixel buffer, never the codec details (spec.md §1, §4.7). The
//! [`Decoder`] trait is that boundary; [`ImageCrateDecoder`] is the one
//! concrete adapter this crate ships, backed by the `image` crate's JPEG
//! support. It does not decode JPEG-2000 (HRIT segments) — no JPEG-2000
//! crate appears anywhere in this codebase's dependency corpus, so a decode
//! there simply reports [`RasterError::Decode`], which the product
//! assembler treats as a blank segment per spec.md §7.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to decode raster image: {0}")]
    Decode(String),
}

/// A decoded image segment as 8-bit RGB, row-major.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

pub trait Decoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage, RasterError>;
}

/// Decodes whatever raster format the `image` crate recognises from its
/// magic bytes (in practice, JPEG for LRIT segments).
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl Decoder for ImageCrateDecoder {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage, RasterError> {
        let img = image::load_from_memory(data).map_err(|e| RasterError::Decode(e.to_string()))?;
        let rgb = img.to_rgb8();
        Ok(DecodedImage {
            width: rgb.width(),
            height: rgb.height(),
            rgb: rgb.into_raw(),
        })
    }
}
