//! gk2a-xrit — LRIT/HRIT downlink processor for the GEO-KOMPSAT-2A weather satellite.
//!
//! Reconstructs user-level files and composite satellite images from a
//! continuous stream of 892-byte CCSDS Virtual Channel Data Units (VCDUs).

pub mod ccsds;
pub mod config;
pub mod crypto;
pub mod demux;
pub mod products;
pub mod raster;
pub mod source;
