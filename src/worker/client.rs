// src/worker/client.rs
//! Caller side of the image worker protocol.
//!
//! Streams image data through the worker with a single reusable chunk buffer:
//! each `PUT` moves the chunk buffer to the worker and the matching `PUT_ECHO`
//! moves it back before the next chunk is copied in.

use super::actor::{spawn_image_worker, WorkerChannels};
use crate::config::WorkerConfig;
use crate::decoder::DecodeEngine;
use crate::error::ProtocolError;
use crate::messages::{DecodedImage, SessionParams, WorkerRequest, WorkerResponse};
use anyhow::{Context, Result};
use log::*;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub struct ImageWorkerClient {
    request_tx: SyncSender<WorkerRequest>,
    response_rx: Receiver<WorkerResponse>,
    thread_handle: Option<JoinHandle<()>>,
    /// `None` only while the buffer is on the worker side.
    chunk: Option<Box<[u8]>>,
    chunk_size: usize,
    ping_timeout: Duration,
    /// Replies still owed by the worker for exchanges we gave up on. They
    /// arrive in order ahead of anything asked for later and are skipped.
    stale_pongs: usize,
    stale_echoes: usize,
}

impl ImageWorkerClient {
    /// Spawn a worker thread running engine `D` and connect to it.
    pub fn spawn<D>(config: &WorkerConfig) -> Result<Self>
    where
        D: DecodeEngine + 'static,
    {
        let channels = spawn_image_worker::<D>(config)?;
        Ok(Self::from_channels(channels, config))
    }

    /// Wrap channels to an already running worker.
    pub fn from_channels(channels: WorkerChannels, config: &WorkerConfig) -> Self {
        let WorkerChannels {
            request_tx,
            response_rx,
            thread_handle,
        } = channels;
        Self {
            request_tx,
            response_rx,
            thread_handle: Some(thread_handle),
            chunk: Some(vec![0u8; config.chunk_size.max(1)].into_boxed_slice()),
            chunk_size: config.chunk_size.max(1),
            ping_timeout: Duration::from_millis(config.ping_timeout_ms),
            stale_pongs: 0,
            stale_echoes: 0,
        }
    }

    fn send(&self, request: WorkerRequest) -> Result<(), ProtocolError> {
        self.request_tx
            .send(request)
            .map_err(|_| ProtocolError::WorkerDisconnected)
    }

    fn recv(&mut self) -> Result<WorkerResponse, ProtocolError> {
        loop {
            let response = self
                .response_rx
                .recv()
                .map_err(|_| ProtocolError::WorkerDisconnected)?;
            if let Some(response) = self.skip_stale(response) {
                return Ok(response);
            }
        }
    }

    /// Swallow a reply left over from an abandoned exchange. A stale echo
    /// still carries the chunk buffer, so keep it if ours went missing.
    fn skip_stale(&mut self, response: WorkerResponse) -> Option<WorkerResponse> {
        match response {
            WorkerResponse::Pong if self.stale_pongs > 0 => {
                self.stale_pongs -= 1;
                debug!("ImageWorkerClient: Skipping late PONG");
                None
            }
            WorkerResponse::PutEcho(buffer) if self.stale_echoes > 0 => {
                self.stale_echoes -= 1;
                debug!("ImageWorkerClient: Skipping late PUT_ECHO");
                if self.chunk.is_none() {
                    self.chunk = Some(buffer);
                }
                None
            }
            other => Some(other),
        }
    }

    /// Probe the worker. `Ok(())` once a `PONG` arrives within the timeout.
    ///
    /// A `PONG` that misses the timeout is skipped when it turns up later.
    pub fn ping(&mut self) -> Result<(), ProtocolError> {
        self.send(WorkerRequest::Ping)?;
        let deadline = Instant::now() + self.ping_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => match self.skip_stale(response) {
                    None => continue,
                    Some(WorkerResponse::Pong) => return Ok(()),
                    Some(other) => {
                        self.stale_pongs += 1;
                        return Err(ProtocolError::UnexpectedResponse {
                            expected: "PONG",
                            got: other.kind().to_string(),
                        });
                    }
                },
                Err(RecvTimeoutError::Timeout) => {
                    self.stale_pongs += 1;
                    warn!(
                        "ImageWorkerClient: No PONG within {:?} ({} outstanding)",
                        self.ping_timeout, self.stale_pongs
                    );
                    return Err(ProtocolError::PingTimeout(
                        self.ping_timeout.as_millis() as u64,
                    ));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ProtocolError::WorkerDisconnected)
                }
            }
        }
    }

    /// Decode `data` in one session.
    ///
    /// `Ok(None)` means the session succeeded but produced an empty image.
    /// An image over the worker's size limit is an error.
    pub fn decode(&mut self, params: SessionParams, data: &[u8]) -> Result<Option<DecodedImage>> {
        self.send(WorkerRequest::Init(params))?;

        for piece in data.chunks(self.chunk_size) {
            if let Err(e) = self.put(piece) {
                // Leave the worker idle before reporting.
                self.send(WorkerRequest::End { success: false }).ok();
                return Err(e).context("Failed to stream image data to worker");
            }
        }

        self.send(WorkerRequest::End { success: true })?;
        match self.recv()? {
            WorkerResponse::ImageReady(image) => {
                debug!(
                    "ImageWorkerClient: Decoded {} bytes -> {:?}",
                    data.len(),
                    image
                );
                Ok(image)
            }
            WorkerResponse::ImageRejected(err) => Err(err).context("Image rejected by worker"),
            other => Err(ProtocolError::UnexpectedResponse {
                expected: "IMAGE_READY",
                got: other.kind().to_string(),
            }
            .into()),
        }
    }

    /// Hand a delivered image's region back so the next image can reuse it.
    pub fn return_buffer(&self, image: DecodedImage) -> Result<(), ProtocolError> {
        self.send(WorkerRequest::BufferReturn {
            buffer: image.into_buffer(),
        })
    }

    /// Copy `piece` into the chunk buffer, send it, and wait for it to come back.
    fn put(&mut self, piece: &[u8]) -> Result<(), ProtocolError> {
        let mut buffer = self.chunk.take().unwrap_or_else(|| {
            // Lost with a failed round trip; start over with a fresh one.
            debug!("ImageWorkerClient: Reallocating chunk buffer");
            vec![0u8; self.chunk_size].into_boxed_slice()
        });

        buffer[..piece.len()].copy_from_slice(piece);
        self.send(WorkerRequest::Put {
            buffer,
            length: piece.len(),
        })?;

        match self.recv()? {
            WorkerResponse::PutEcho(buffer) => {
                self.chunk = Some(buffer);
                Ok(())
            }
            other => {
                // Our echo is still on its way.
                self.stale_echoes += 1;
                Err(ProtocolError::UnexpectedResponse {
                    expected: "PUT_ECHO",
                    got: other.kind().to_string(),
                })
            }
        }
    }

    /// Close the request channel and wait for the worker thread to exit.
    pub fn shutdown(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        let Some(handle) = self.thread_handle.take() else {
            return Ok(());
        };

        // Replace the sender with a dead one so the worker sees the disconnect.
        let (dead_tx, _) = std::sync::mpsc::sync_channel(1);
        drop(std::mem::replace(&mut self.request_tx, dead_tx));

        info!("ImageWorkerClient: Waiting for worker thread");
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("Image worker thread panicked"))
    }
}

impl Drop for ImageWorkerClient {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            error!("ImageWorkerClient: {:#}", e);
        }
    }
}
