use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

use crate::config::VALUE_CEILING;

/// A half-open range `[low, high)` handed to exactly one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub id: u64,
    pub low: u64,
    pub high: u64,
}

/// Hands out consecutive, disjoint chunks of the number line.
///
/// The only synchronization is one relaxed fetch-add: chunk ids are unique,
/// and each chunk's bounds are a pure function of its id.
pub struct ChunkAllocator {
    next: CachePadded<AtomicU64>,
    first: u64,
    span: u64,
}

impl ChunkAllocator {
    pub fn new(first: u64, span: u64) -> Self {
        debug_assert!(span > 0);
        Self {
            next: CachePadded::new(AtomicU64::new(0)),
            first,
            span,
        }
    }

    /// Claims the next chunk, or `None` once the value domain is exhausted.
    pub fn acquire(&self) -> Option<Chunk> {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.chunk(id)
    }

    /// Bounds of chunk `id`, if it lies below the value ceiling.
    pub fn chunk(&self, id: u64) -> Option<Chunk> {
        let low = id
            .checked_mul(self.span)
            .and_then(|offset| offset.checked_add(self.first))?;
        let high = low.checked_add(self.span)?;
        if high > VALUE_CEILING {
            return None;
        }
        Some(Chunk { id, low, high })
    }

    /// Number of `acquire` calls so far, including ones past the ceiling.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Upper bound of the last chunk handed out (diagnostic only).
    pub fn frontier(&self) -> u64 {
        match self.issued() {
            0 => self.first,
            n => self
                .chunk(n - 1)
                .map_or(VALUE_CEILING, |chunk| chunk.high),
        }
    }
}
