//! Raw TCP byte source: a stream of back-to-back 892-byte VCDUs with no
//! framing of its own (spec.md §6, grounded on the original's `setup_input`
//! "tcp" branch and its `loop()` read of exactly `buflen` bytes).

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::info;

use crate::ccsds::vcdu::VCDU_LEN;
use crate::demux::VcduSender;

pub async fn run(addr: &str, tx: VcduSender) -> Result<()> {
    info!(addr, "connecting to TCP VCDU source");
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to TCP source {addr}"))?;
    info!(addr, "connected");

    let mut buf = vec![0u8; VCDU_LEN];
    loop {
        match stream.read_exact(&mut buf).await {
            Ok(_) => {
                if tx.send(buf.clone()).is_err() {
                    return Ok(());
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                info!("TCP source closed connection");
                return Ok(());
            }
            Err(e) => return Err(e).context("lost connection to TCP source"),
        }
    }
}
