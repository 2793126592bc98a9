// src/worker/actor.rs
//! Image worker thread.
//!
//! Runs an [`ImageWorker`] on a dedicated thread so decoding never blocks the
//! caller. Requests and responses are ordered, one-at-a-time messages; buffers
//! travel inside them by move.
//!
//! Threading model:
//! - Owns: ImageWorker (decode session + spare output region)
//! - Requests: bounded channel, capacity from `WorkerConfig::request_queue_depth`
//! - Responses: unbounded channel, so the worker never blocks on its reply path
//! - Exits when the request sender is dropped or the response receiver is gone

use super::ImageWorker;
use crate::config::WorkerConfig;
use crate::decoder::DecodeEngine;
use crate::messages::{WorkerRequest, WorkerResponse};
use anyhow::{Context, Result};
use log::*;
use std::sync::mpsc::{channel, sync_channel, Receiver, Sender, SyncSender};
use std::thread::{self, JoinHandle};

/// Channels for communicating with the worker thread
pub struct WorkerChannels {
    pub request_tx: SyncSender<WorkerRequest>,
    pub response_rx: Receiver<WorkerResponse>,
    pub thread_handle: JoinHandle<()>,
}

/// Receive requests, handle them, send replies until either side hangs up.
fn run<D: DecodeEngine>(
    mut worker: ImageWorker<D>,
    request_rx: Receiver<WorkerRequest>,
    response_tx: Sender<WorkerResponse>,
) {
    info!("ImageWorker: Thread started");

    while let Ok(request) = request_rx.recv() {
        let Some(response) = worker.handle_request(request) else {
            continue;
        };

        trace!("ImageWorker: Sending {}", response.kind());
        if let Err(e) = response_tx.send(response) {
            warn!(
                "ImageWorker: Failed to send {} (caller closed)",
                e.0.kind()
            );
            break;
        }
    }

    info!("ImageWorker: Thread stopped");
}

/// Spawn the worker thread and return channels for communication
pub fn spawn_image_worker<D>(config: &WorkerConfig) -> Result<WorkerChannels>
where
    D: DecodeEngine + 'static,
{
    info!(
        "spawn_image_worker: Creating channels (queue depth {}, max image {} bytes)",
        config.request_queue_depth, config.max_image_bytes
    );

    let (request_tx, request_rx) = sync_channel(config.request_queue_depth.max(1));
    let (response_tx, response_rx) = channel();
    let config = config.clone();

    let thread_handle = thread::Builder::new()
        .name("image-worker".to_string())
        .spawn(move || {
            let worker = ImageWorker::<D>::new(&config);
            run(worker, request_rx, response_tx);
        })
        .context("Failed to spawn image worker thread")?;

    info!("spawn_image_worker: Worker thread spawned");

    Ok(WorkerChannels {
        request_tx,
        response_rx,
        thread_handle,
    })
}
