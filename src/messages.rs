// src/messages.rs
//! Message types for communication between a caller and the image worker.
//!
//! All buffer traffic is ownership transfer: a `Box<[u8]>` or `Vec<u8>` moved
//! into a message belongs to the receiver until it is moved back. There is no
//! shared buffer state between the two sides.
//!
//! The serde representation mirrors the worker wire shape
//! `{"type": "PUT", "payload": {...}}`. Tags this version does not know
//! deserialize to [`WorkerRequest::Unknown`].

use crate::error::ProtocolError;
use crate::palette::PaletteName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters of a decode session, carried by `INIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParams {
    /// Background fill, packed RGBA.
    pub fill_color: u32,
    pub palette_name: PaletteName,
    /// Color register limit handed to the decode engine.
    pub limit: u32,
}

/// Requests sent from the caller to the worker.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRequest {
    /// Start a decode session. Replaces any session in progress.
    Init(SessionParams),

    /// Feed `buffer[..length]` to the session.
    /// Worker takes ownership and responds with `PutEcho` carrying the same buffer.
    Put { buffer: Box<[u8]>, length: usize },

    /// Finish the session. `success == false` discards it without a reply.
    End { success: bool },

    /// Give a delivered image region back to the worker for reuse. No reply.
    BufferReturn { buffer: Vec<u8> },

    /// Liveness probe. Always answered with `Pong`.
    Ping,

    /// A tag this version does not understand. Ignored.
    #[serde(other)]
    Unknown,
}

/// Responses sent from the worker to the caller.
#[derive(Debug)]
pub enum WorkerResponse {
    /// Chunk buffer ownership returned after a `Put`.
    PutEcho(Box<[u8]>),

    /// Result of `End { success: true }`. `None` for an empty image.
    ImageReady(Option<DecodedImage>),

    /// The decoded image exceeds the configured output limit.
    ImageRejected(ProtocolError),

    /// Answer to `Ping`.
    Pong,
}

impl WorkerResponse {
    /// Short tag for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerResponse::PutEcho(_) => "PUT_ECHO",
            WorkerResponse::ImageReady(_) => "IMAGE_READY",
            WorkerResponse::ImageRejected(_) => "IMAGE_REJECTED",
            WorkerResponse::Pong => "PONG",
        }
    }
}

/// A decoded RGBA image. `buffer.len() == width * height * 4`.
///
/// The region's capacity may be larger than its length when the worker reused
/// a region from an earlier, bigger image.
pub struct DecodedImage {
    pub buffer: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    /// Returns the RGBA bytes of the pixel at `(x, y)`, if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.buffer.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Gives up the pixel region so it can be returned to the worker.
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.buffer.len())
            .field("capacity", &self.buffer.capacity())
            .finish()
    }
}
