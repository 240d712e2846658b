//! gk2a-xrit — LRIT/HRIT downlink processor for the GEO-KOMPSAT-2A weather satellite.

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gk2a_xrit::config::{DemuxConfig, SourceKind};
use gk2a_xrit::crypto::KeyTable;
use gk2a_xrit::demux::Demuxer;
use gk2a_xrit::raster::ImageCrateDecoder;
use gk2a_xrit::source;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = DemuxConfig::load(Some(&cli.config))
        .context("could not load configuration (see --config)")?;

    if cli.verbose {
        config.verbose = true;
    }
    if let Some(dump) = &cli.dump {
        config.dump_file = Some(dump.clone());
    }
    if let Some(file) = &cli.file {
        config.source = SourceKind::File;
        config.input = file
            .to_str()
            .context("packet file path is not valid UTF-8")?
            .to_string();
    }

    tracing::info!(
        spacecraft = config.spacecraft.as_str(),
        downlink = config.downlink.as_str(),
        source = ?config.source,
        input = %config.input,
        output = %config.output.display(),
        "starting gk2a-xrit"
    );

    let keys = match &config.key_file {
        Some(path) => {
            KeyTable::load(path).with_context(|| format!("failed to load key file {}", path.display()))?
        }
        None => {
            tracing::warn!("no key file configured; encrypted xRIT files will be saved undecrypted");
            KeyTable::empty()
        }
    };
    if keys.is_empty() {
        tracing::warn!("decryption keys unavailable; saving encrypted xRIT files instead of images");
        config.save_images = false;
        config.save_xrit = true;
    } else {
        tracing::info!(count = keys.len(), "decryption keys loaded");
    }

    let decoder = Arc::new(ImageCrateDecoder);
    let (demuxer, sender) = Demuxer::new(config.clone(), keys, decoder);

    let source_handle = tokio::spawn(async move { source::run(&config, sender).await });

    demuxer.run().await;

    match source_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "byte source terminated"),
        Err(e) => tracing::error!(error = %e, "byte source task panicked"),
    }

    if cli.no_exit {
        tracing::info!("pausing main thread (--no-exit)");
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
    }

    Ok(())
}
