// src/error.rs
//! Typed errors for the image worker protocol.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Image {width}x{height} needs {bytes} bytes, limit is {max_bytes}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        bytes: usize,
        max_bytes: usize,
    },
    #[error("Image worker channel disconnected")]
    WorkerDisconnected,
    #[error("Unexpected worker response: expected {expected}, got {got}")]
    UnexpectedResponse {
        expected: &'static str,
        got: String,
    },
    #[error("Image worker did not answer PING within {0} ms")]
    PingTimeout(u64),
}
