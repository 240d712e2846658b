//! File replay source: reads a recorded VCDU stream from disk, then pushes a
//! single synthetic fill VCDU at EOF to flush whatever reassembly is still
//! in flight (spec.md §6, grounded on the original's `loop()` "file" branch,
//! which appends `VCID 63` on EOF "to trigger TP_File processing inside
//! channel handlers by changing the currently active VCID").

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::ccsds::vcdu::{fill_vcdu, VCDU_LEN};
use crate::demux::VcduSender;

pub async fn run(path: &str, tx: VcduSender) -> Result<()> {
    info!(path, "replaying VCDU stream from file");
    let mut file = File::open(path)
        .await
        .with_context(|| format!("failed to open packet file {path}"))?;

    let mut buf = vec![0u8; VCDU_LEN];
    loop {
        let mut read = 0;
        while read < VCDU_LEN {
            let n = file.read(&mut buf[read..]).await.context("packet file read failed")?;
            if n == 0 {
                break;
            }
            read += n;
        }

        if read == 0 {
            info!("reached end of packet file");
            let _ = tx.send(fill_vcdu());
            return Ok(());
        }
        if read != VCDU_LEN {
            anyhow::bail!("packet file ended mid-VCDU ({read} of {VCDU_LEN} bytes)");
        }

        if tx.send(buf.clone()).is_err() {
            return Ok(());
        }
    }
}
