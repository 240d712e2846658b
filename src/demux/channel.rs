//! Per-VCID channel state machine (spec.md §4.5).

use std::path::PathBuf;

use tracing::{debug, warn};

use super::router::ChannelContext;
use crate::ccsds::{CpPdu, MPdu, Sequence, SPdu, TpFile, Vcdu, XritFile};
use crate::products::{self, Product, ProductName};

/// Full width of the VCDU continuity counter; it wraps modulo this value.
const COUNTER_MODULUS: u32 = 1 << 24;

pub struct Channel {
    vcid: u8,
    counter: Option<u32>,
    cppdu: Option<CpPdu>,
    tpfile: Option<TpFile>,
    product: Option<Box<dyn Product>>,
}

impl Channel {
    pub fn new(vcid: u8) -> Self {
        Channel {
            vcid,
            counter: None,
            cppdu: None,
            tpfile: None,
            product: None,
        }
    }

    /// Processes one VCDU already routed to this channel (spec.md §4.5).
    pub fn data_in(&mut self, vcdu: &Vcdu, ctx: &ChannelContext) {
        self.check_continuity(vcdu.counter);

        let mpdu = MPdu::parse(&vcdu.mpdu_zone);

        if !mpdu.has_header() {
            // Case A: entire packet zone continues the current CP_PDU.
            match self.cppdu.as_mut() {
                Some(cppdu) => cppdu.append(mpdu.packet_zone),
                None => debug!(vcid = self.vcid, "dropped M_PDU continuation, no in-flight CP_PDU"),
            }
            return;
        }

        // Case B: a CP_PDU header starts at mpdu.pointer.
        let pointer = mpdu.pointer as usize;
        let (pre, post) = mpdu.packet_zone.split_at(pointer.min(mpdu.packet_zone.len()));

        if let Some(mut finishing) = self.cppdu.take() {
            match finishing.finish(pre) {
                Some((len_ok, crc_ok)) => {
                    if !len_ok || !crc_ok {
                        debug!(vcid = self.vcid, len_ok, crc_ok, "CP_PDU finished with length/CRC mismatch");
                    }
                    self.handle_cppdu(finishing, ctx);
                }
                None => warn!(vcid = self.vcid, "no CP_PDU to finish (dropped packets?)"),
            }
        }

        let mut next = CpPdu::new(post);
        if !next.is_parsed() {
            self.cppdu = Some(next);
            return;
        }

        // Short-packet special case (spec.md §4.5.2 step 3).
        let header = next.header.expect("checked is_parsed above");
        if header.length > 1 && (header.length as usize) < 886 && next.payload.len() > header.length as usize {
            next.truncate_payload(header.length as usize);
            if let Some((len_ok, crc_ok)) = next.finish(&[]) {
                if !len_ok || !crc_ok {
                    debug!(vcid = self.vcid, len_ok, crc_ok, "short CP_PDU finished with length/CRC mismatch");
                }
                if next.is_eof() {
                    self.cppdu = None;
                    return;
                }
                self.handle_cppdu(next, ctx);
                return;
            }
        }

        if next.is_eof() {
            self.cppdu = None;
            return;
        }

        self.cppdu = Some(next);
    }

    fn check_continuity(&mut self, counter: u32) {
        if let Some(last) = self.counter {
            let gap = (counter + COUNTER_MODULUS - last - 1) % COUNTER_MODULUS;
            if gap > 0 {
                warn!(vcid = self.vcid, gap, last, current = counter, "dropped packets");
            }
        }
        self.counter = Some(counter);
    }

    fn handle_cppdu(&mut self, cppdu: CpPdu, ctx: &ChannelContext) {
        let header = match cppdu.header {
            Some(h) => h,
            None => return,
        };
        let payload = &cppdu.payload;
        let trimmed: &[u8] = if payload.len() >= 2 { &payload[..payload.len() - 2] } else { &[] };

        match header.seq {
            Sequence::First => match TpFile::new(trimmed) {
                Some(tpfile) => self.tpfile = Some(tpfile),
                None => debug!(vcid = self.vcid, "dropped FIRST CP_PDU, payload too short for TP_File header"),
            },
            Sequence::Single => match TpFile::new(trimmed) {
                Some(mut tpfile) => {
                    let len_ok = tpfile.finish(&[]);
                    self.close_tpfile(tpfile, len_ok, ctx);
                }
                None => debug!(vcid = self.vcid, "dropped SINGLE CP_PDU, payload too short for TP_File header"),
            },
            Sequence::Continue => {
                if let Some(tpfile) = self.tpfile.as_mut() {
                    tpfile.append(trimmed);
                } else {
                    debug!(vcid = self.vcid, "dropped CONTINUE CP_PDU, no in-flight TP_File");
                }
            }
            Sequence::Last => {
                if let Some(mut tpfile) = self.tpfile.take() {
                    let len_ok = tpfile.finish(trimmed);
                    self.close_tpfile(tpfile, len_ok, ctx);
                } else {
                    debug!(vcid = self.vcid, "dropped LAST CP_PDU, no in-flight TP_File");
                }
            }
        }
    }

    fn close_tpfile(&mut self, tpfile: TpFile, len_ok: bool, ctx: &ChannelContext) {
        self.tpfile = None;

        if !len_ok {
            warn!(
                vcid = self.vcid,
                expected = tpfile.length,
                actual = tpfile.payload.len(),
                "TP_File length mismatch, skipping file"
            );
            return;
        }

        self.emit_xrit(&tpfile.payload, ctx);
    }

    fn emit_xrit(&mut self, tpfile_payload: &[u8], ctx: &ChannelContext) {
        let spdu = match SPdu::decrypt(tpfile_payload, &ctx.keys) {
            Ok(s) => s,
            Err(err) => {
                warn!(vcid = self.vcid, %err, "failed to decrypt S_PDU");
                return;
            }
        };

        let mut xrit_bytes = spdu.header_field;
        xrit_bytes.extend_from_slice(&spdu.data_field);

        let xrit = match XritFile::parse(xrit_bytes) {
            Ok(x) => x,
            Err(err) => {
                warn!(vcid = self.vcid, %err, "failed to parse xRIT file");
                return;
            }
        };

        self.handle_xrit(&xrit, ctx);
    }

    fn handle_xrit(&mut self, xrit: &XritFile, ctx: &ChannelContext) {
        let mut saved_xrit_path: Option<PathBuf> = None;
        if ctx.save_xrit {
            match save_xrit_file(xrit, ctx) {
                Ok(path) => saved_xrit_path = Some(path),
                Err(err) => warn!(vcid = self.vcid, %err, "failed to save xRIT file"),
            }
        }
        if let Some(path) = saved_xrit_path {
            ctx.report_xrit(path);
        }

        if !ctx.save_images {
            return;
        }

        if self.product.is_none() {
            match products::new(ctx.spacecraft, ctx.downlink, ctx.decoder.clone(), &xrit.file_name) {
                Ok(product) => self.product = Some(product),
                Err(err) => {
                    warn!(vcid = self.vcid, %err, "failed to classify product");
                    return;
                }
            }
        }

        if let Some(product) = self.product.as_mut() {
            if let Err(err) = product.add(xrit) {
                warn!(vcid = self.vcid, %err, "failed to add xRIT to product");
            }

            if product.is_complete() {
                self.flush_product(ctx);
            }
        }
    }

    fn flush_product(&mut self, ctx: &ChannelContext) {
        if let Some(product) = self.product.take() {
            match product.save(&ctx.output_root) {
                Ok(path) => ctx.report_image(path),
                Err(err) => warn!(vcid = self.vcid, %err, "failed to save product"),
            }
        }
    }

    /// Called by the router when another VCID becomes active
    /// (spec.md §4.5.4).
    pub fn notify(&mut self, new_vcid: u8, ctx: &ChannelContext) {
        if new_vcid == self.vcid {
            return;
        }

        if let Some(tpfile) = self.tpfile.take() {
            self.emit_xrit(&tpfile.payload, ctx);
            if tpfile.payload.len() < tpfile.length as usize {
                warn!(
                    vcid = self.vcid,
                    actual = tpfile.payload.len(),
                    expected = tpfile.length,
                    "file is incomplete"
                );
            }
        } else if self.product.is_some() {
            self.flush_product(ctx);
        }

        self.cppdu = None;
    }
}

fn save_xrit_file(xrit: &XritFile, ctx: &ChannelContext) -> anyhow::Result<PathBuf> {
    let name = ProductName::parse(&xrit.file_name, ctx.downlink)?;
    let dir = name.output_dir(&ctx.output_root, ctx.downlink);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(&xrit.file_name);
    std::fs::write(&path, &xrit.data)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Downlink, Spacecraft};
    use crate::crypto::KeyTable;
    use crate::raster::{DecodedImage, Decoder, RasterError};
    use std::sync::Arc;

    struct NullDecoder;
    impl Decoder for NullDecoder {
        fn decode(&self, _data: &[u8]) -> Result<DecodedImage, RasterError> {
            Err(RasterError::Decode("unsupported in test".into()))
        }
    }

    fn test_context(dir: &std::path::Path) -> ChannelContext {
        ChannelContext {
            spacecraft: Spacecraft::Gk2a,
            downlink: Downlink::Lrit,
            keys: Arc::new(KeyTable::empty()),
            decoder: Arc::new(NullDecoder),
            output_root: dir.to_path_buf(),
            save_xrit: false,
            save_images: true,
            status: Default::default(),
        }
    }

    fn crc16(data: &[u8]) -> u16 {
        crate::ccsds::crc::checksum(data)
    }

    fn build_cppdu(apid: u16, seq: Sequence, counter: u16, payload_body: &[u8]) -> Vec<u8> {
        let seq_bits: u64 = match seq {
            Sequence::Continue => 0,
            Sequence::First => 1,
            Sequence::Last => 2,
            Sequence::Single => 3,
        };
        let mut payload = payload_body.to_vec();
        let crc = crc16(&payload);
        payload.extend_from_slice(&crc.to_be_bytes());

        let length_field = (payload.len() as u64) - 1;
        let mut header: u64 = 0;
        header |= (apid as u64 & 0x7FF) << 32;
        header |= seq_bits << 30;
        header |= (counter as u64 & 0x3FFF) << 16;
        header |= length_field & 0xFFFF;

        let mut bytes = header.to_be_bytes()[2..].to_vec();
        bytes.extend_from_slice(&payload);
        bytes
    }

    fn build_tpfile_payload(counter: u16, body: &[u8]) -> Vec<u8> {
        let mut out = counter.to_be_bytes().to_vec();
        out.extend_from_slice(&((body.len() as u64) * 8).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn build_xrit(file_name: &str, data_field: &[u8]) -> Vec<u8> {
        let annotation_len = 3 + file_name.len();
        let header_len = 16 + annotation_len;
        let mut header = Vec::new();
        header.push(0u8);
        header.extend_from_slice(&16u16.to_be_bytes());
        header.push(2u8);
        header.extend_from_slice(&(header_len as u32).to_be_bytes());
        header.extend_from_slice(&(data_field.len() as u64).to_be_bytes());
        header.push(7u8);
        header.extend_from_slice(&7u16.to_be_bytes());
        header.extend_from_slice(&0u32.to_be_bytes());
        header.push(4u8);
        header.extend_from_slice(&(annotation_len as u16).to_be_bytes());
        header.extend_from_slice(file_name.as_bytes());
        let mut out = header;
        out.extend_from_slice(data_field);
        out
    }

    fn mpdu_zone(pointer: u16, packet_zone: &[u8]) -> Vec<u8> {
        let mut zone = vec![0u8; 886];
        let header: u16 = pointer & 0x7FF;
        zone[..2].copy_from_slice(&header.to_be_bytes());
        let take = packet_zone.len().min(884);
        zone[2..2 + take].copy_from_slice(&packet_zone[..take]);
        zone
    }

    fn vcdu_from_mpdu(counter: u32, mpdu_zone_bytes: Vec<u8>) -> Vcdu {
        let mut buf = vec![0u8; 892];
        let header: u64 = (195u64) << 38 | ((4u64) << 32) | ((counter as u64) << 8);
        buf[..6].copy_from_slice(&header.to_be_bytes()[2..]);
        buf[6..].copy_from_slice(&mpdu_zone_bytes);
        Vcdu::parse(&buf)
    }

    #[test]
    fn short_single_cppdu_text_file_end_to_end() {
        let dir = std::env::temp_dir().join(format!("gk2a-xrit-channel-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let ctx = test_context(&dir);

        let text_payload = b"schedule body";
        let xrit = build_xrit("ANT_ANT_001_20210101_000000_00.txt", text_payload);
        let tpfile_payload = build_tpfile_payload(1, &xrit);
        let cppdu_bytes = build_cppdu(4, Sequence::Single, 0, &tpfile_payload);

        let zone = mpdu_zone(0, &cppdu_bytes);
        let vcdu = vcdu_from_mpdu(0, zone);

        let mut channel = Channel::new(4);
        channel.data_in(&vcdu, &ctx);

        let expected = dir.join("LRIT").join("20210101").join("ANT").join("ANT_ANT_001_20210101_000000_00.txt");
        assert_eq!(std::fs::read(&expected).unwrap(), text_payload);
    }

    #[test]
    fn continuity_wrap_is_not_a_drop() {
        let mut channel = Channel::new(0);
        channel.counter = Some(COUNTER_MODULUS - 1);
        channel.check_continuity(0);
        assert_eq!(channel.counter, Some(0));
    }

    #[test]
    fn continuity_gap_is_recorded_but_does_not_panic() {
        let mut channel = Channel::new(0);
        channel.counter = Some(5);
        channel.check_continuity(10);
        assert_eq!(channel.counter, Some(10));
    }

    /// Dropped CONTINUE segments leave the TP_File short of its declared
    /// length; the LAST CP_PDU still closes it out, but the mismatch is
    /// caught and the file is discarded rather than saved (spec.md §8
    /// scenario 4).
    #[test]
    fn tpfile_length_mismatch_is_discarded_without_panic() {
        let dir = std::env::temp_dir().join(format!("gk2a-xrit-mismatch-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let ctx = test_context(&dir);

        let mut header = vec![0u8; 10];
        header[..2].copy_from_slice(&1u16.to_be_bytes());
        header[2..].copy_from_slice(&(500u64 * 8).to_be_bytes()); // declares 500 bytes
        let mut first_body = header;
        first_body.extend_from_slice(&[0xAA; 40]);

        let first_cppdu = build_cppdu(0, Sequence::First, 0, &first_body);
        let last_cppdu = build_cppdu(0, Sequence::Last, 1, &[0xBB; 10]); // far short of 500

        let mut channel = Channel::new(0);

        let zone1 = mpdu_zone(0, &first_cppdu);
        channel.data_in(&vcdu_from_mpdu(0, zone1), &ctx);
        assert!(channel.tpfile.is_some());

        // Followed immediately by LAST: the middle CONTINUE run was dropped.
        let zone2 = mpdu_zone(0, &last_cppdu);
        channel.data_in(&vcdu_from_mpdu(1, zone2), &ctx);

        assert!(channel.tpfile.is_none(), "TP_File slot must be cleared even on mismatch");
        assert!(
            std::fs::read_dir(&dir).map(|mut d| d.next().is_none()).unwrap_or(true),
            "no output should be produced for a length-mismatched file"
        );
    }

    /// A VCID change with a FIRST+CONTINUE run still in flight forces the
    /// channel to decrypt and emit whatever was assembled, logging the file
    /// as incomplete, then clears its state (spec.md §8 scenario 6).
    #[test]
    fn vcid_switch_abandons_partial_tpfile() {
        let dir = std::env::temp_dir().join(format!("gk2a-xrit-vcidswitch-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let ctx = test_context(&dir);

        let mut header = vec![0u8; 10];
        header[..2].copy_from_slice(&1u16.to_be_bytes());
        header[2..].copy_from_slice(&(1000u64 * 8).to_be_bytes()); // declares far more than supplied
        let mut first_body = header;
        first_body.extend_from_slice(&[0x11; 40]);

        let first_cppdu = build_cppdu(0, Sequence::First, 0, &first_body);
        let continue_cppdu = build_cppdu(0, Sequence::Continue, 1, &[0x22; 40]);

        let mut channel = Channel::new(0);
        channel.data_in(&vcdu_from_mpdu(0, mpdu_zone(0, &first_cppdu)), &ctx);
        channel.data_in(&vcdu_from_mpdu(1, mpdu_zone(0, &continue_cppdu)), &ctx);
        assert!(channel.tpfile.is_some());

        channel.notify(4, &ctx);

        assert!(channel.tpfile.is_none(), "partial TP_File must be cleared on VCID switch");
        assert!(channel.cppdu.is_none(), "in-flight CP_PDU must be dropped on VCID switch");
    }
}
