//! nanomsg-framed TCP source (goesrecv's `spacecraft` publisher), spec.md
//! §6, grounded on the original's `setup_input` "nng" branch: after
//! connecting, a fixed 8-byte SP header handshake subscribes to the
//! publisher, and each VCDU then arrives prefixed by an 8-byte frame header.

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::info;

use crate::ccsds::vcdu::VCDU_LEN;
use crate::demux::VcduSender;

const SUBSCRIBE: [u8; 8] = [0x00, 0x53, 0x50, 0x00, 0x00, 0x21, 0x00, 0x00];
const SUBSCRIBE_ACK: [u8; 8] = [0x00, 0x53, 0x50, 0x00, 0x00, 0x20, 0x00, 0x00];
const FRAME_HEADER_LEN: usize = 8;

pub async fn run(addr: &str, tx: VcduSender) -> Result<()> {
    info!(addr, "connecting to nanomsg VCDU source");
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to nanomsg source {addr}"))?;
    info!(addr, "connected");

    stream
        .write_all(&SUBSCRIBE)
        .await
        .context("failed to send nanomsg subscribe handshake")?;

    let mut ack = [0u8; FRAME_HEADER_LEN];
    stream
        .read_exact(&mut ack)
        .await
        .context("failed to read nanomsg subscribe acknowledgement")?;
    if ack != SUBSCRIBE_ACK {
        bail!("nanomsg source did not acknowledge subscription (got {ack:02x?})");
    }

    let mut frame = vec![0u8; FRAME_HEADER_LEN + VCDU_LEN];
    loop {
        match stream.read_exact(&mut frame).await {
            Ok(_) => {
                if tx.send(frame[FRAME_HEADER_LEN..].to_vec()).is_err() {
                    return Ok(());
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                info!("nanomsg source closed connection");
                return Ok(());
            }
            Err(e) => return Err(e).context("lost connection to nanomsg source"),
        }
    }
}
