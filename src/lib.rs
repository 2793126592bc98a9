// src/lib.rs

//! Image decoding worker and screen buffer set for the terminal.
//!
//! - [`worker`]: the decode protocol run on a dedicated thread, handing decoded
//!   RGBA images back to the caller by ownership transfer.
//! - [`buffer`]: the single spare output region the worker reuses.
//! - [`decoder`]: the engine interface the worker drives, plus a headless engine.
//! - [`screen`]: the normal/alternate screen pair with cursor carry-over.

pub mod buffer;
pub mod config;
pub mod decoder;
pub mod error;
pub mod messages;
pub mod palette;
pub mod screen;
pub mod worker;

pub use buffer::BufferManager;
pub use config::{Config, CONFIG};
pub use decoder::{DecodeEngine, HeadlessDecoder};
pub use error::ProtocolError;
pub use messages::{DecodedImage, SessionParams, WorkerRequest, WorkerResponse};
pub use palette::{Palette, PaletteName};
pub use screen::{BufferSet, LineStorage, Lines, ScreenBuffer, ScreenKind};
pub use worker::{spawn_image_worker, ImageWorker, ImageWorkerClient, WorkerChannels};
