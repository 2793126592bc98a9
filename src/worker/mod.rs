// src/worker/mod.rs
//! ImageWorker - the decode protocol state machine.
//!
//! One `ImageWorker` serves one caller. It is driven one request at a time by
//! [`ImageWorker::handle_request`] and answers with at most one response:
//!
//! - `Init(params)` → no reply (enters `Decoding`)
//! - `Put { buffer, length }` → `PutEcho(buffer)`
//! - `End { success: false }` → no reply (back to `Idle`)
//! - `End { success: true }` → `ImageReady(..)` or `ImageRejected(..)`
//! - `BufferReturn { buffer }` → no reply
//! - `Ping` → `Pong`
//! - `Unknown` → no reply
//!
//! The output region is handed over inside `ImageReady` and is gone from the
//! worker until the caller sends it back with `BufferReturn`.

pub mod actor;
pub mod client;

pub use actor::{spawn_image_worker, WorkerChannels};
pub use client::ImageWorkerClient;

use crate::buffer::BufferManager;
use crate::config::WorkerConfig;
use crate::decoder::DecodeEngine;
use crate::error::ProtocolError;
use crate::messages::{DecodedImage, SessionParams, WorkerRequest, WorkerResponse};
use log::*;

/// Bytes per RGBA pixel in the output region.
pub const BYTES_PER_PIXEL: usize = 4;

/// A live decode session: the engine plus the parameters it was created with.
struct DecodeSession<D> {
    engine: D,
    params: SessionParams,
    fed_bytes: usize,
}

enum SessionState<D> {
    Idle,
    Decoding(DecodeSession<D>),
}

pub struct ImageWorker<D: DecodeEngine> {
    state: SessionState<D>,
    buffers: BufferManager,
}

impl<D: DecodeEngine> ImageWorker<D> {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            state: SessionState::Idle,
            buffers: BufferManager::new(config.max_image_bytes),
        }
    }

    /// True between `Init` and `End`.
    pub fn is_decoding(&self) -> bool {
        matches!(self.state, SessionState::Decoding(_))
    }

    /// The spare output region, for inspection.
    pub fn buffers(&self) -> &BufferManager {
        &self.buffers
    }

    /// Process one request, returning the reply if the request has one.
    pub fn handle_request(&mut self, request: WorkerRequest) -> Option<WorkerResponse> {
        match request {
            WorkerRequest::Init(params) => {
                self.start_session(params);
                None
            }
            WorkerRequest::Put { buffer, length } => {
                self.feed(&buffer, length);
                Some(WorkerResponse::PutEcho(buffer))
            }
            WorkerRequest::End { success } => self.end_session(success),
            WorkerRequest::BufferReturn { buffer } => {
                self.buffers.release(buffer);
                None
            }
            WorkerRequest::Ping => Some(WorkerResponse::Pong),
            WorkerRequest::Unknown => {
                debug!("ImageWorker: Ignoring unknown request");
                None
            }
        }
    }

    fn start_session(&mut self, params: SessionParams) {
        if self.is_decoding() {
            debug!("ImageWorker: INIT during a session, replacing it");
        }
        debug!(
            "ImageWorker: Starting session (palette {}, fill {:#010x}, limit {})",
            params.palette_name, params.fill_color, params.limit
        );

        let engine = D::new(
            params.fill_color,
            params.palette_name.private_copy(),
            params.limit,
        );
        self.state = SessionState::Decoding(DecodeSession {
            engine,
            params,
            fed_bytes: 0,
        });
    }

    fn feed(&mut self, buffer: &[u8], length: usize) {
        let SessionState::Decoding(session) = &mut self.state else {
            warn!("ImageWorker: PUT without a session, echoing buffer untouched");
            return;
        };

        if length > buffer.len() {
            warn!(
                "ImageWorker: PUT length {} exceeds buffer size {}, clamping",
                length,
                buffer.len()
            );
        }
        let chunk = &buffer[..length.min(buffer.len())];
        session.fed_bytes += chunk.len();

        if let Err(e) = session.engine.feed(chunk) {
            // Per-chunk failures are settled by the caller's END.
            debug!("ImageWorker: Decoder rejected chunk: {:#}", e);
        }
    }

    fn end_session(&mut self, success: bool) -> Option<WorkerResponse> {
        let state = std::mem::replace(&mut self.state, SessionState::Idle);

        if !success {
            debug!("ImageWorker: Session ended unsuccessfully, discarding");
            return None;
        }

        let mut session = match state {
            SessionState::Decoding(session) => session,
            SessionState::Idle => {
                debug!("ImageWorker: END without a session");
                return Some(WorkerResponse::ImageReady(None));
            }
        };

        let width = session.engine.width();
        let height = session.engine.height();
        if width == 0 || height == 0 {
            debug!(
                "ImageWorker: Empty image ({}x{}) after {} bytes",
                width, height, session.fed_bytes
            );
            return Some(WorkerResponse::ImageReady(None));
        }

        let bytes = match image_bytes(width, height) {
            Some(bytes) if bytes <= self.buffers.max_bytes() => bytes,
            too_large => {
                let err = ProtocolError::ImageTooLarge {
                    width,
                    height,
                    bytes: too_large.unwrap_or(usize::MAX),
                    max_bytes: self.buffers.max_bytes(),
                };
                warn!("ImageWorker: {}", err);
                return Some(WorkerResponse::ImageRejected(err));
            }
        };

        let region = match self.buffers.acquire(bytes) {
            Ok(region) => region,
            Err(err) => {
                warn!("ImageWorker: {}", err);
                return Some(WorkerResponse::ImageRejected(err));
            }
        };
        session.engine.render_into(&mut region[..bytes], width, height);

        let Some(buffer) = self.buffers.take() else {
            error!("ImageWorker: Output region vanished after acquire");
            return Some(WorkerResponse::ImageReady(None));
        };

        debug!(
            "ImageWorker: Image {}x{} ready ({} bytes, palette {})",
            width, height, bytes, session.params.palette_name
        );
        Some(WorkerResponse::ImageReady(Some(DecodedImage {
            buffer,
            width,
            height,
        })))
    }
}

/// `width * height * 4`, or `None` if that overflows `usize`.
pub fn image_bytes(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}

#[cfg(test)]
mod tests;
