//! Demultiplexer router: owns the VCDU FIFO and the per-VCID channel table
//! (spec.md §4.4).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::channel::Channel;
use crate::ccsds::vcdu::VCDU_LEN;
use crate::ccsds::Vcdu;
use crate::config::{DemuxConfig, Downlink, Spacecraft};
use crate::crypto::KeyTable;
use crate::raster::Decoder;

/// Immutable context shared by reference with every channel (spec.md §9
/// "pass an immutable configuration record... do not use process-wide
/// globals").
pub struct ChannelContext {
    pub spacecraft: Spacecraft,
    pub downlink: Downlink,
    pub keys: Arc<KeyTable>,
    pub decoder: Arc<dyn Decoder>,
    pub output_root: PathBuf,
    pub save_xrit: bool,
    pub save_images: bool,
    pub status: Arc<Mutex<DemuxStatus>>,
}

impl ChannelContext {
    pub fn report_xrit(&self, path: PathBuf) {
        self.status.lock().unwrap().latest_xrit = Some(path);
    }

    pub fn report_image(&self, path: PathBuf) {
        self.status.lock().unwrap().latest_image = Some(path);
    }
}

/// A point-in-time snapshot of demuxer activity, the in-process analogue of
/// the upstream project's HTTP status dashboard (explicitly out of scope,
/// spec.md §1 — this is the in-core equivalent SPEC_FULL keeps).
#[derive(Debug, Clone, Default)]
pub struct DemuxStatus {
    pub current_vcid: Option<u8>,
    pub channel_count: usize,
    pub latest_xrit: Option<PathBuf>,
    pub latest_image: Option<PathBuf>,
}

/// Sends raw VCDU buffers into the demux core's FIFO. Cloned into the
/// source task.
#[derive(Clone)]
pub struct VcduSender(mpsc::UnboundedSender<Vec<u8>>);

impl VcduSender {
    pub fn send(&self, vcdu: Vec<u8>) -> Result<(), mpsc::error::SendError<Vec<u8>>> {
        self.0.send(vcdu)
    }
}

pub struct Demuxer {
    config: DemuxConfig,
    keys: Arc<KeyTable>,
    decoder: Arc<dyn Decoder>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    status: Arc<Mutex<DemuxStatus>>,
    dump_path: Option<PathBuf>,
}

impl Demuxer {
    pub fn new(config: DemuxConfig, keys: KeyTable, decoder: Arc<dyn Decoder>) -> (Self, VcduSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dump_path = config.dump_file.clone();
        let demuxer = Demuxer {
            config,
            keys: Arc::new(keys),
            decoder,
            rx,
            status: Arc::new(Mutex::new(DemuxStatus::default())),
            dump_path,
        };
        (demuxer, VcduSender(tx))
    }

    pub fn status(&self) -> Arc<Mutex<DemuxStatus>> {
        self.status.clone()
    }

    /// Half the nominal VCDU period, the core loop's idle-sleep duration
    /// (spec.md §4.4 step 1, §5).
    fn idle_period(&self) -> Duration {
        let bits_per_vcdu = (VCDU_LEN * 8) as u64;
        let seconds_per_vcdu = bits_per_vcdu as f64 / self.config.downlink.bitrate() as f64;
        Duration::from_secs_f64(seconds_per_vcdu / 2.0)
    }

    /// Runs the demux core loop until the channel closes (spec.md §4.4,
    /// §5 "Cancellation" — dropping the sender is this crate's stop signal).
    pub async fn run(mut self) {
        let ctx = ChannelContext {
            spacecraft: self.config.spacecraft,
            downlink: self.config.downlink,
            keys: self.keys.clone(),
            decoder: self.decoder.clone(),
            output_root: self.config.output.clone(),
            save_xrit: self.config.save_xrit,
            save_images: self.config.save_images,
            status: self.status.clone(),
        };
        let ignored: HashSet<u8> = self.config.ignored_vcids.clone();
        let idle = self.idle_period();

        let mut channels: HashMap<u8, Channel> = HashMap::new();
        let mut last_vcid: Option<u8> = None;
        let mut last_dumped_vcid: Option<u8> = None;

        loop {
            let packet = match self.rx.try_recv() {
                Ok(packet) => packet,
                Err(mpsc::error::TryRecvError::Empty) => {
                    tokio::time::sleep(idle).await;
                    continue;
                }
                Err(mpsc::error::TryRecvError::Disconnected) => break,
            };

            let vcdu = Vcdu::parse(&packet);

            if let Some(dump_path) = &self.dump_path {
                if let Err(e) = dump_vcdu(dump_path, &packet, vcdu.vcid, &mut last_dumped_vcid) {
                    debug!(error = %e, "failed to write packet dump");
                }
            }

            if !vcdu.is_gk2a() {
                debug!(scid = vcdu.scid, "spacecraft not supported, discarding VCDU");
                continue;
            }

            if last_vcid != Some(vcdu.vcid) {
                for channel in channels.values_mut() {
                    channel.notify(vcdu.vcid, &ctx);
                }
                info!(vcid = vcdu.vcid, "VCID changed");
                last_vcid = Some(vcdu.vcid);
                ctx.status.lock().unwrap().current_vcid = Some(vcdu.vcid);
            }

            if vcdu.is_fill() || ignored.contains(&vcdu.vcid) {
                continue;
            }

            let channel = channels.entry(vcdu.vcid).or_insert_with(|| Channel::new(vcdu.vcid));
            channel.data_in(&vcdu, &ctx);
            ctx.status.lock().unwrap().channel_count = channels.len();
        }
    }
}

pub fn dump_vcdu(dump_path: &Path, packet: &[u8], vcid: u8, last_vcid: &mut Option<u8>) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(dump_path)?;

    const FILL_VCID: u8 = 63;
    if vcid != FILL_VCID {
        file.write_all(packet)?;
    } else if *last_vcid != Some(FILL_VCID) {
        file.write_all(packet)?;
    }
    *last_vcid = Some(vcid);
    Ok(())
}
