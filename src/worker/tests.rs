// src/worker/tests.rs

use super::*;
use crate::decoder::HeadlessDecoder;
use crate::palette::{from_rgba, to_rgba, Palette, PaletteName, PALETTE_ANSI_256};
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use test_log::test;

// --- Test Helpers ---

const FILL: u32 = to_rgba(10, 20, 30, 255);

fn worker() -> ImageWorker<HeadlessDecoder> {
    ImageWorker::new(&WorkerConfig::default())
}

fn worker_with_limit(max_image_bytes: usize) -> ImageWorker<HeadlessDecoder> {
    ImageWorker::new(&WorkerConfig {
        max_image_bytes,
        ..WorkerConfig::default()
    })
}

fn init(palette_name: PaletteName) -> WorkerRequest {
    WorkerRequest::Init(SessionParams {
        fill_color: FILL,
        palette_name,
        limit: 256,
    })
}

fn put(bytes: &[u8]) -> WorkerRequest {
    WorkerRequest::Put {
        buffer: bytes.to_vec().into_boxed_slice(),
        length: bytes.len(),
    }
}

/// Runs INIT, one PUT per chunk, and END(true); returns the END reply.
fn decode<D: DecodeEngine>(worker: &mut ImageWorker<D>, chunks: &[&str]) -> Option<WorkerResponse> {
    assert!(worker.handle_request(init(PaletteName::Vt340Color)).is_none());
    for chunk in chunks {
        let echo = worker.handle_request(put(chunk.as_bytes()));
        assert!(matches!(echo, Some(WorkerResponse::PutEcho(_))));
    }
    worker.handle_request(WorkerRequest::End { success: true })
}

fn expect_image(response: Option<WorkerResponse>) -> DecodedImage {
    match response {
        Some(WorkerResponse::ImageReady(Some(image))) => image,
        other => panic!("expected an image, got {:?}", other),
    }
}

thread_local! {
    static SEEN_PALETTE: RefCell<Option<Palette>> = const { RefCell::new(None) };
}

/// Engine that scribbles over its palette and reports a fixed 2x2 image,
/// failing every chunk it is fed.
struct ScribblingEngine {
    palette: Palette,
}

impl DecodeEngine for ScribblingEngine {
    fn new(_fill_color: u32, mut palette: Palette, _limit: u32) -> Self {
        SEEN_PALETTE.with(|seen| *seen.borrow_mut() = Some(palette.clone()));
        palette.fill(0xDEAD_BEEF);
        Self { palette }
    }

    fn feed(&mut self, _data: &[u8]) -> Result<()> {
        Err(anyhow!("not sixel"))
    }

    fn width(&self) -> u32 {
        2
    }

    fn height(&self) -> u32 {
        2
    }

    fn render_into(&mut self, target: &mut [u8], _width: u32, _height: u32) {
        let rgba = from_rgba(self.palette[0]);
        for pixel in target.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
    }
}

// --- Liveness ---

#[test]
fn ping_answers_pong_in_every_state() {
    let mut worker = worker();
    assert!(matches!(worker.handle_request(WorkerRequest::Ping), Some(WorkerResponse::Pong)));

    worker.handle_request(init(PaletteName::Ansi256));
    assert!(worker.is_decoding());
    assert!(matches!(worker.handle_request(WorkerRequest::Ping), Some(WorkerResponse::Pong)));
    assert!(worker.is_decoding(), "PING must not disturb the session");
}

#[test]
fn unknown_requests_are_ignored() {
    let mut worker = worker();
    worker.handle_request(init(PaletteName::Ansi256));
    assert!(worker.handle_request(WorkerRequest::Unknown).is_none());
    assert!(worker.is_decoding());
}

// --- PUT ---

#[test]
fn put_returns_the_same_buffer() {
    let mut worker = worker();
    worker.handle_request(init(PaletteName::Ansi256));

    let buffer = vec![b'"'; 32].into_boxed_slice();
    let sent_ptr = buffer.as_ptr();
    let response = worker.handle_request(WorkerRequest::Put { buffer, length: 1 });

    match response {
        Some(WorkerResponse::PutEcho(echoed)) => {
            assert_eq!(echoed.as_ptr(), sent_ptr);
            assert_eq!(echoed.len(), 32);
        }
        other => panic!("expected PUT_ECHO, got {:?}", other),
    }
}

#[test]
fn put_without_session_still_echoes() {
    let mut worker = worker();
    let response = worker.handle_request(put(b"\"1;1;4;4"));
    assert!(matches!(response, Some(WorkerResponse::PutEcho(buf)) if &buf[..] == b"\"1;1;4;4"));
    assert!(!worker.is_decoding());
}

#[test]
fn put_feeds_only_the_declared_length() {
    let mut worker = worker();
    worker.handle_request(init(PaletteName::Ansi256));

    // Bytes past `length` would turn the height into 399999.
    worker.handle_request(WorkerRequest::Put {
        buffer: b"\"1;1;2;399999".to_vec().into_boxed_slice(),
        length: 8,
    });
    worker.handle_request(put(b"~"));

    let image = expect_image(worker.handle_request(WorkerRequest::End { success: true }));
    assert_eq!((image.width, image.height), (2, 3));
}

#[test]
fn put_length_past_the_buffer_is_clamped() {
    let mut worker = worker();
    worker.handle_request(init(PaletteName::Ansi256));
    let response = worker.handle_request(WorkerRequest::Put {
        buffer: b"\"1;1;1;1~".to_vec().into_boxed_slice(),
        length: 1000,
    });
    assert!(matches!(response, Some(WorkerResponse::PutEcho(_))));
    let image = expect_image(worker.handle_request(WorkerRequest::End { success: true }));
    assert_eq!((image.width, image.height), (1, 1));
}

// --- END ---

#[test]
fn failed_session_produces_no_reply() {
    let mut worker = worker();
    worker.handle_request(init(PaletteName::Ansi256));
    worker.handle_request(put(b"\"1;1;4;4~~~~"));

    assert!(worker.handle_request(WorkerRequest::End { success: false }).is_none());
    assert!(!worker.is_decoding());
    assert_eq!(worker.buffers().allocations(), 0);
}

#[test]
fn zero_area_image_is_reported_as_none() {
    let mut worker = worker();
    let response = decode(&mut worker, &["\"1;1;0;5~"]);
    assert!(matches!(response, Some(WorkerResponse::ImageReady(None))));

    let response = decode(&mut worker, &["#0~~~"]);
    assert!(matches!(response, Some(WorkerResponse::ImageReady(None))));
    assert!(!worker.is_decoding());
}

#[test]
fn successful_end_without_session_reports_none() {
    let mut worker = worker();
    let response = worker.handle_request(WorkerRequest::End { success: true });
    assert!(matches!(response, Some(WorkerResponse::ImageReady(None))));
}

#[test]
fn image_is_delivered_and_released_by_the_worker() {
    let mut worker = worker();
    let image = expect_image(decode(&mut worker, &["\"1;1;", "3;2", "#0~~~-~~~"]));

    assert_eq!((image.width, image.height), (3, 2));
    assert_eq!(image.buffer.len(), 3 * 2 * 4);
    assert_eq!(image.pixel(2, 1), Some([10, 20, 30, 255]));
    assert!(!worker.buffers().is_held(), "worker must not keep a delivered region");
    assert!(!worker.is_decoding());
}

#[test]
fn decoder_errors_do_not_fail_the_session() {
    let mut worker: ImageWorker<ScribblingEngine> = ImageWorker::new(&WorkerConfig::default());
    let image = expect_image(decode(&mut worker, &["garbage", "more garbage"]));
    assert_eq!((image.width, image.height), (2, 2));
}

#[test]
fn malformed_header_yields_empty_image() {
    let mut worker = worker();
    let response = decode(&mut worker, &["\"1;1~"]);
    assert!(matches!(response, Some(WorkerResponse::ImageReady(None))));
}

#[test]
fn init_replaces_a_running_session() {
    let mut worker = worker();
    worker.handle_request(init(PaletteName::Ansi256));
    worker.handle_request(put(b"\"1;1;9;9~"));

    let image = expect_image(decode(&mut worker, &["\"1;1;1;2~"]));
    assert_eq!((image.width, image.height), (1, 2));
}

// --- Size limit ---

#[test]
fn oversized_image_is_rejected_without_allocating() {
    let mut worker = worker_with_limit(4 * 4 * 4);
    let response = decode(&mut worker, &["\"1;1;5;4~"]);

    match response {
        Some(WorkerResponse::ImageRejected(ProtocolError::ImageTooLarge {
            width,
            height,
            bytes,
            max_bytes,
        })) => {
            assert_eq!((width, height), (5, 4));
            assert_eq!(bytes, 80);
            assert_eq!(max_bytes, 64);
        }
        other => panic!("expected IMAGE_REJECTED, got {:?}", other),
    }
    assert_eq!(worker.buffers().allocations(), 0);
    assert!(!worker.is_decoding());

    let image = expect_image(decode(&mut worker, &["\"1;1;4;4~"]));
    assert_eq!(image.buffer.len(), 64);
}

#[test]
fn image_bytes_detects_overflow() {
    assert_eq!(image_bytes(3, 2), Some(24));
    assert_eq!(image_bytes(0, 100), Some(0));
    assert_eq!(image_bytes(u32::MAX, u32::MAX), None);
}

// --- Buffer reuse ---

#[test]
fn returned_region_is_reused_without_allocation() {
    let mut worker = worker();
    let first = expect_image(decode(&mut worker, &["\"1;1;8;8~"]));
    assert_eq!(worker.buffers().allocations(), 1);

    let first_ptr = first.buffer.as_ptr();
    worker.handle_request(WorkerRequest::BufferReturn {
        buffer: first.into_buffer(),
    });
    assert!(worker.buffers().is_held());

    let second = expect_image(decode(&mut worker, &["\"1;1;4;4~"]));
    assert_eq!(worker.buffers().allocations(), 1);
    assert_eq!(second.buffer.as_ptr(), first_ptr);
    assert_eq!(second.buffer.len(), 4 * 4 * 4);
    assert!(second.buffer.capacity() >= 8 * 8 * 4);
}

#[test]
fn growing_images_get_a_region_that_fits() {
    let mut worker = worker();
    let first = expect_image(decode(&mut worker, &["\"1;1;2;2~"]));
    worker.handle_request(WorkerRequest::BufferReturn {
        buffer: first.into_buffer(),
    });

    let second = expect_image(decode(&mut worker, &["\"1;1;6;5~"]));
    assert_eq!(worker.buffers().allocations(), 2);
    assert!(second.buffer.capacity() >= 6 * 5 * 4);
    assert_eq!(second.buffer.len(), 6 * 5 * 4);
}

#[test]
fn without_a_return_each_image_allocates() {
    let mut worker = worker();
    let _first = expect_image(decode(&mut worker, &["\"1;1;2;2~"]));
    let _second = expect_image(decode(&mut worker, &["\"1;1;2;2~"]));
    assert_eq!(worker.buffers().allocations(), 2);
}

#[test]
fn buffer_return_replaces_the_held_region() {
    let mut worker = worker();
    worker.handle_request(WorkerRequest::BufferReturn {
        buffer: Vec::with_capacity(1024),
    });
    worker.handle_request(WorkerRequest::BufferReturn {
        buffer: Vec::with_capacity(8),
    });
    assert!(worker.buffers().capacity() < 1024);
}

// --- Palettes ---

#[test]
fn engine_gets_a_private_palette_copy() {
    let mut worker: ImageWorker<ScribblingEngine> = ImageWorker::new(&WorkerConfig::default());
    let image = expect_image(decode(&mut worker, &["x"]));

    // The engine painted with its scribbled register 0 ...
    assert_eq!(image.pixel(0, 0), Some(from_rgba(0xDEAD_BEEF)));
    // ... while the shared table is untouched.
    assert_eq!(PaletteName::Vt340Color.table()[0], to_rgba(0, 0, 0, 255));
}

#[test]
fn unknown_palette_name_uses_ansi_256() {
    let mut worker: ImageWorker<ScribblingEngine> = ImageWorker::new(&WorkerConfig::default());
    worker.handle_request(init(PaletteName::from_name("VT100-AMBER")));

    let seen = SEEN_PALETTE.with(|seen| seen.borrow_mut().take()).unwrap();
    assert_eq!(seen.len(), 256);
    assert_eq!(&seen[..], &PALETTE_ANSI_256[..]);
}
