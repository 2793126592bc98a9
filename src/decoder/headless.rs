//! Headless decode engine.
//!
//! Reads only the sixel raster attributes (`"Pan;Pad;Ph;Pv`) at the start of
//! the stream and paints the declared `Ph x Pv` area with the fill color.
//! Sixel bands after the header are counted but not interpreted. Used by the
//! CLI and by tests that need the protocol to run end to end without a pixel
//! decoder.

use super::DecodeEngine;
use crate::palette::{from_rgba, Palette};
use anyhow::{anyhow, Result};
use log::{debug, trace};

/// Hard cap on color registers, matching the VT340's addressable range.
pub const MAX_PALETTE_REGISTERS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderState {
    /// Before the first significant byte.
    Start,
    /// Inside `"Pan;Pad;Ph;Pv`.
    Params,
    /// Header finished (or absent); the rest is image body.
    Body,
    /// Header was malformed; the image is unusable.
    Failed,
}

pub struct HeadlessDecoder {
    fill_color: u32,
    palette: Palette,
    state: HeaderState,
    params: Vec<u32>,
    current: u32,
    width: u32,
    height: u32,
    body_bytes: usize,
}

impl HeadlessDecoder {
    /// Session palette, truncated to the register limit.
    pub fn palette(&self) -> &[u32] {
        &self.palette
    }

    /// Bytes seen after the raster attributes.
    pub fn body_bytes(&self) -> usize {
        self.body_bytes
    }

    fn finish_header(&mut self) -> Result<()> {
        self.params.push(self.current);
        self.current = 0;

        if self.params.len() < 4 {
            self.state = HeaderState::Failed;
            return Err(anyhow!(
                "raster attributes need 4 parameters, got {}",
                self.params.len()
            ));
        }

        self.width = self.params[2];
        self.height = self.params[3];
        self.state = HeaderState::Body;
        debug!(
            "HeadlessDecoder: Raster attributes {:?} -> {}x{}",
            self.params, self.width, self.height
        );
        Ok(())
    }
}

impl DecodeEngine for HeadlessDecoder {
    fn new(fill_color: u32, mut palette: Palette, limit: u32) -> Self {
        let registers = (limit as usize).clamp(1, MAX_PALETTE_REGISTERS);
        palette.resize(registers, 0);
        Self {
            fill_color,
            palette,
            state: HeaderState::Start,
            params: Vec::with_capacity(4),
            current: 0,
            width: 0,
            height: 0,
            body_bytes: 0,
        }
    }

    fn feed(&mut self, data: &[u8]) -> Result<()> {
        trace!("HeadlessDecoder: feed {} bytes in {:?}", data.len(), self.state);

        for (i, &byte) in data.iter().enumerate() {
            match self.state {
                HeaderState::Start => match byte {
                    b'\r' | b'\n' | b' ' => {}
                    b'"' => self.state = HeaderState::Params,
                    _ => {
                        debug!("HeadlessDecoder: No raster attributes, image has no size");
                        self.state = HeaderState::Body;
                        self.body_bytes += data.len() - i;
                        return Ok(());
                    }
                },
                HeaderState::Params => match byte {
                    b'0'..=b'9' => {
                        self.current = self
                            .current
                            .checked_mul(10)
                            .and_then(|v| v.checked_add(u32::from(byte - b'0')))
                            .ok_or_else(|| {
                                self.state = HeaderState::Failed;
                                anyhow!("raster attribute parameter overflows")
                            })?;
                    }
                    b';' => {
                        self.params.push(self.current);
                        self.current = 0;
                    }
                    _ => {
                        self.finish_header()?;
                        self.body_bytes += data.len() - i;
                        return Ok(());
                    }
                },
                HeaderState::Body => {
                    self.body_bytes += data.len() - i;
                    return Ok(());
                }
                HeaderState::Failed => {
                    return Err(anyhow!("decoder already failed"));
                }
            }
        }
        Ok(())
    }

    fn width(&self) -> u32 {
        match self.state {
            HeaderState::Body => self.width,
            _ => 0,
        }
    }

    fn height(&self) -> u32 {
        match self.state {
            HeaderState::Body => self.height,
            _ => 0,
        }
    }

    fn render_into(&mut self, target: &mut [u8], width: u32, height: u32) {
        let rgba = from_rgba(self.fill_color);
        let pixels = width as usize * height as usize;
        for pixel in target.chunks_exact_mut(4).take(pixels) {
            pixel.copy_from_slice(&rgba);
        }
    }
}
