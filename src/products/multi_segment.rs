//! Multi-segment image products (e.g. GK-2A Full Disk), spec.md §4.7.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageBuffer, Rgb, RgbImage};
use tracing::warn;

use super::{Product, ProductError, ProductName};
use crate::ccsds::XritFile;
use crate::config::Downlink;
use crate::raster::{DecodedImage, Decoder};

fn resolution(mode: &str, downlink: Downlink, channel: &str) -> Option<(u32, u32)> {
    match (downlink, mode, channel) {
        (Downlink::Lrit, "FD", "IR105") => Some((2200, 2200)),
        (Downlink::Hrit, "FD", "VI006") => Some((11000, 11000)),
        (Downlink::Hrit, "FD", "IR105" | "IR123" | "SW038" | "WV069") => Some((2750, 2750)),
        _ => None,
    }
}

fn expected_segments(downlink: Downlink) -> u32 {
    match downlink {
        Downlink::Lrit => 10,
        Downlink::Hrit => 50,
    }
}

pub struct MultiSegmentImage {
    name: ProductName,
    downlink: Downlink,
    decoder: Arc<dyn Decoder>,
    images: HashMap<String, HashMap<u32, DecodedImage>>,
    counter: u32,
}

impl MultiSegmentImage {
    pub fn new(name: ProductName, downlink: Downlink, decoder: Arc<dyn Decoder>) -> Self {
        MultiSegmentImage {
            name,
            downlink,
            decoder,
            images: HashMap::new(),
            counter: 0,
        }
    }
}

impl Product for MultiSegmentImage {
    fn name(&self) -> &ProductName {
        &self.name
    }

    fn add(&mut self, xrit: &XritFile) -> Result<(), ProductError> {
        let parts = xrit
            .name_parts()
            .map_err(|_| ProductError::BadFileName(xrit.file_name.clone()))?;
        let channel = parts
            .channel
            .ok_or_else(|| ProductError::BadFileName(xrit.file_name.clone()))?;
        let segment: u32 = parts
            .segment_number
            .parse()
            .map_err(|_| ProductError::BadFileName(xrit.file_name.clone()))?;

        match self.decoder.decode(xrit.data_field()) {
            Ok(decoded) => {
                self.images.entry(channel).or_default().insert(segment, decoded);
                self.counter += 1;
            }
            Err(err) => {
                warn!(%err, channel = %channel, segment, "raster decode failed, leaving segment blank");
            }
        }

        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.counter >= expected_segments(self.downlink)
    }

    fn save(&self, root: &Path) -> Result<PathBuf, ProductError> {
        let dir = self.name.output_dir(root, self.downlink);
        std::fs::create_dir_all(&dir)?;

        let mut last_path = dir.clone();
        for (channel, segments) in &self.images {
            let Some((width, height)) = resolution(&self.name.mode, self.downlink, channel) else {
                warn!(channel = %channel, mode = %self.name.mode, "no known resolution for channel, skipping");
                continue;
            };

            let mut canvas: RgbImage = ImageBuffer::from_pixel(width, height, Rgb([0, 0, 0]));
            for (segment, decoded) in segments {
                let y_offset = (segment - 1) * decoded.height;
                for y in 0..decoded.height {
                    if y_offset + y >= height {
                        break;
                    }
                    for x in 0..decoded.width.min(width) {
                        let idx = ((y * decoded.width + x) * 3) as usize;
                        if idx + 2 >= decoded.rgb.len() {
                            continue;
                        }
                        canvas.put_pixel(
                            x,
                            y_offset + y,
                            Rgb([decoded.rgb[idx], decoded.rgb[idx + 1], decoded.rgb[idx + 2]]),
                        );
                    }
                }
            }

            let file_name = format!("{}.jpg", self.name.full.replace("<CHANNEL>", channel));
            let path = dir.join(file_name);
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                std::fs::File::create(&path)?,
                100,
            );
            canvas
                .write_with_encoder(encoder)
                .map_err(|e| ProductError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
            last_path = path;
        }

        Ok(last_path)
    }
}
