// src/decoder/mod.rs
//! DecodeEngine trait - the interface the image worker drives.
//!
//! The worker never decodes pixels itself. It constructs one engine per
//! session, feeds it the bytes of every `PUT`, and at `END` asks it for its
//! dimensions and to paint RGBA pixels into a region the worker owns.
//!
//! ## Lifecycle
//! 1. `new(fill_color, palette, limit)` on `INIT`. The palette is the session's
//!    private copy; the engine may modify it freely.
//! 2. `feed(bytes)` once per `PUT`. Errors are reported but the worker does
//!    not act on them; overall success is decided by the caller at `END`.
//! 3. `width()`/`height()` and `render_into(..)` on a successful `END`.
//! 4. `Drop` - the session ends on every `END`.

pub mod headless;

pub use headless::HeadlessDecoder;

use crate::palette::Palette;
use anyhow::Result;

pub trait DecodeEngine {
    /// Create an engine for one decode session.
    fn new(fill_color: u32, palette: Palette, limit: u32) -> Self
    where
        Self: Sized;

    /// Consume the next chunk of image data.
    fn feed(&mut self, data: &[u8]) -> Result<()>;

    /// Width of the decoded image in pixels, 0 if nothing usable was decoded.
    fn width(&self) -> u32;

    /// Height of the decoded image in pixels, 0 if nothing usable was decoded.
    fn height(&self) -> u32;

    /// Write `width * height` RGBA pixels into `target`.
    ///
    /// `target.len()` is exactly `width * height * 4`.
    fn render_into(&mut self, target: &mut [u8], width: u32, height: u32);
}
