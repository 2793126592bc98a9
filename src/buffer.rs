// src/buffer.rs
//! BufferManager - holds at most one spare output region between decodes.
//!
//! Regions are `Vec<u8>`: `capacity()` is what the region can hold without
//! reallocating, `len()` is how many bytes of it the current image uses.
//! Ownership of the region leaves the manager with [`BufferManager::take`] and
//! comes back with [`BufferManager::release`].

use crate::error::ProtocolError;
use log::{debug, trace};

pub struct BufferManager {
    spare: Option<Vec<u8>>,
    max_bytes: usize,
    allocations: usize,
}

impl BufferManager {
    /// Create an empty manager that refuses regions larger than `max_bytes`.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            spare: None,
            max_bytes,
            allocations: 0,
        }
    }

    /// Returns the held region sized to `min_bytes`, allocating only if needed.
    ///
    /// The held region is reused when its capacity already covers `min_bytes`;
    /// otherwise a region of exactly `min_bytes` replaces it. The returned
    /// region has `len() == min_bytes`. Stale bytes from a previous image are
    /// not cleared; the caller overwrites the whole length.
    pub fn acquire(&mut self, min_bytes: usize) -> Result<&mut Vec<u8>, ProtocolError> {
        if min_bytes > self.max_bytes {
            return Err(ProtocolError::ImageTooLarge {
                width: 0,
                height: 0,
                bytes: min_bytes,
                max_bytes: self.max_bytes,
            });
        }

        let reusable = self
            .spare
            .as_ref()
            .is_some_and(|region| region.capacity() >= min_bytes);

        if !reusable {
            debug!(
                "BufferManager: Allocating {} bytes (held capacity {})",
                min_bytes,
                self.capacity()
            );
            self.spare = Some(Vec::with_capacity(min_bytes));
            self.allocations += 1;
        } else {
            trace!("BufferManager: Reusing region for {} bytes", min_bytes);
        }

        let region = self.spare.get_or_insert_with(Vec::new);
        region.resize(min_bytes, 0);
        Ok(region)
    }

    /// Store a region for reuse, dropping whatever was held before.
    pub fn release(&mut self, region: Vec<u8>) {
        trace!(
            "BufferManager: Region returned (capacity {}, replacing {})",
            region.capacity(),
            self.capacity()
        );
        self.spare = Some(region);
    }

    /// Remove the held region so its ownership can be transferred.
    pub fn take(&mut self) -> Option<Vec<u8>> {
        self.spare.take()
    }

    /// Capacity of the held region, 0 if none is held.
    pub fn capacity(&self) -> usize {
        self.spare.as_ref().map_or(0, Vec::capacity)
    }

    pub fn is_held(&self) -> bool {
        self.spare.is_some()
    }

    /// Number of fresh allocations `acquire` has made.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}
