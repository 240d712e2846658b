//! Plain-text products (e.g. the GK-2A LRIT Daily Operation Plan), spec.md §4.7.

use std::path::{Path, PathBuf};

use tracing::info;

use super::{Product, ProductError, ProductName};
use crate::ccsds::XritFile;
use crate::config::Downlink;

const DOP_MAGIC: &[u8] = b"GK-2A AMI LRIT DOP(Daily Operation Plan)";

pub struct AlphanumericText {
    name: ProductName,
    downlink: Downlink,
    file_stem: String,
    payload: Vec<u8>,
    complete: bool,
}

impl AlphanumericText {
    pub fn new(name: ProductName, downlink: Downlink) -> Self {
        AlphanumericText {
            name,
            downlink,
            file_stem: String::new(),
            payload: Vec::new(),
            complete: false,
        }
    }
}

impl Product for AlphanumericText {
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
        let path = dir.join(format!("{}.txt", self.file_stem));
        std::fs::write(&path, &self.payload)?;

        if self.payload.get(..DOP_MAGIC.len()) == Some(DOP_MAGIC) {
            info!("saved GK-2A LRIT Daily Operation Plan");
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xrit_with_payload(file_name: &str, payload: &[u8]) -> XritFile {
        let annotation_len = 3 + file_name.len();
        let header_len = 16 + annotation_len;

        let mut header = Vec::new();
        header.push(0u8);
        header.extend_from_slice(&16u16.to_be_bytes());
        header.push(2u8);
        header.extend_from_slice(&(header_len as u32).to_be_bytes());
        header.extend_from_slice(&(payload.len() as u64).to_be_bytes());
        header.push(4u8);
        header.extend_from_slice(&(annotation_len as u16).to_be_bytes());
        header.extend_from_slice(file_name.as_bytes());

        let mut out = header;
        out.extend_from_slice(payload);
        XritFile::parse(out).unwrap()
    }

    #[test]
    fn saves_payload_verbatim_with_segment_suffix() {
        let name = ProductName::parse("ANT_ANT_001_20210101_000000_00.txt", Downlink::Lrit).unwrap();
        let mut product = AlphanumericText::new(name, Downlink::Lrit);
        let xrit = xrit_with_payload("ANT_ANT_001_20210101_000000_00.txt", b"schedule contents");
        product.add(&xrit).unwrap();
        assert!(product.is_complete());

        let dir = tempfile_dir();
        let path = product.save(&dir).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"schedule contents");
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), "ANT_ANT_001_20210101_000000_00.txt");
    }

    fn tempfile_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("gk2a-xrit-text-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
