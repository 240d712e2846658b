//! Demultiplexer: VCID routing and per-channel reassembly (spec.md §4.4, §4.5).

pub mod channel;
pub mod router;

pub use channel::Channel;
pub use router::{ChannelContext, DemuxStatus, Demuxer, VcduSender};
