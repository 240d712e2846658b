//! Single-segment image products — the catch-all for any product that
//! isn't a recognised multi-segment image or text file (spec.md §4.7).

use std::path::{Path, PathBuf};

use super::{Product, ProductError, ProductName};
use crate::ccsds::XritFile;
use crate::config::Downlink;

pub struct SingleSegmentImage {
    name: ProductName,
    downlink: Downlink,
    file_stem: String,
    payload: Vec<u8>,
    complete: bool,
}

impl SingleSegmentImage {
    pub fn new(name: ProductName, downlink: Downlink) -> Self {
        SingleSegmentImage {
            name,
            downlink,
            file_stem: String::new(),
            payload: Vec::new(),
            complete: false,
        }
    }

    /// Infers an output extension from a magic-byte probe (spec.md §4.7).
    fn extension(&self) -> &'static str {
        if self.payload.get(..3) == Some(b"GIF") {
            "gif"
        } else if self.payload.get(1..4) == Some(b"PNG") {
            "png"
        } else {
            "bin"
        }
    }
}

impl Product for SingleSegmentImage {
    fn name(&self) -> &ProductName {
        &self.name
    }

    fn add(&mut self, xrit: &XritFile) -> Result<(), ProductError> {
        self.file_stem = xrit
            .file_name
            .split('.')
            .next()
            .unwrap_or(&xrit.file_name)
            .to_string();
        self.payload = xrit.data_field().to_vec();
        self.complete = true;
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn save(&self, root: &Path) -> Result<PathBuf, ProductError> {
        let dir = self.name.output_dir(root, self.downlink);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.{}", self.file_stem, self.extension()));
        std::fs::write(&path, &self.payload)?;
        Ok(path)
    }
}
