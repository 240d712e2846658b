//! UDP datagram source: one VCDU per datagram (spec.md §6, grounded on the
//! original's `setup_input`/`loop()` "udp" branch, which binds rather than
//! connects).

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tracing::{info, warn};

use crate::ccsds::vcdu::VCDU_LEN;
use crate::demux::VcduSender;

pub async fn run(addr: &str, tx: VcduSender) -> Result<()> {
    info!(addr, "binding UDP VCDU source");
    let socket = UdpSocket::bind(addr)
        .await
        .with_context(|| format!("failed to bind UDP source {addr}"))?;
    info!(addr, "bound");

    let mut buf = vec![0u8; VCDU_LEN];
    loop {
        let len = socket.recv(&mut buf).await.context("UDP source read failed")?;
        if len != VCDU_LEN {
            warn!(len, "discarding undersized UDP datagram");
            continue;
        }
        if tx.send(buf.clone()).is_err() {
            return Ok(());
        }
    }
}
