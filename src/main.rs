// src/main.rs

use core_term_image::{
    config::CONFIG, HeadlessDecoder, ImageWorkerClient, PaletteName, SessionParams,
};

// Logging
use anyhow::{bail, Context};
use log::{info, warn};

/// Decodes a sixel file through the image worker and reports the result.
///
/// Usage: `core-term-image <sixel-file> [palette]`
fn main() -> anyhow::Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: core-term-image <sixel-file> [VT340-COLOR|VT340-GREY|ANSI-256]");
    };
    let palette_name = args
        .next()
        .map(|name| PaletteName::from_name(&name))
        .unwrap_or(CONFIG.decoder.palette);

    let data = std::fs::read(&path).with_context(|| format!("Failed to read {}", path))?;
    info!("Read {} bytes from {}", data.len(), path);

    // --- Worker ---
    let mut client = ImageWorkerClient::spawn::<HeadlessDecoder>(&CONFIG.worker)
        .context("Failed to start image worker")?;
    client.ping().context("Image worker is not responding")?;

    let params = SessionParams {
        fill_color: CONFIG.decoder.fill_color,
        palette_name,
        limit: CONFIG.decoder.palette_limit,
    };

    match client.decode(params, &data)? {
        Some(image) => {
            info!(
                "Decoded {}x{} image ({} bytes) with palette {}",
                image.width,
                image.height,
                image.buffer.len(),
                palette_name
            );
            client.return_buffer(image)?;
        }
        None => warn!("{} decoded to an empty image", path),
    }

    client.shutdown()?;
    info!("core-term-image exited successfully.");
    Ok(())
}
