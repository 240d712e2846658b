//! VCDU byte sources (spec.md §6). Four concrete adapters reduce to the same
//! contract: read exactly one 892-byte VCDU at a time and push it onto the
//! demux core's FIFO via a [`VcduSender`].

pub mod file;
pub mod nng;
pub mod tcp;
pub mod udp;

use anyhow::Result;

use crate::config::{DemuxConfig, SourceKind};
use crate::demux::VcduSender;

/// Runs the configured byte source until it's exhausted (file replay) or the
/// connection is lost (network sources).
pub async fn run(config: &DemuxConfig, tx: VcduSender) -> Result<()> {
    match config.source {
        SourceKind::Tcp => tcp::run(&config.input, tx).await,
        SourceKind::Nng => nng::run(&config.input, tx).await,
        SourceKind::Udp => udp::run(&config.input, tx).await,
        SourceKind::File => file::run(&config.input, tx).await,
    }
}
