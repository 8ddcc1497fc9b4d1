use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::base_primes::{BasePrimeTable, BasePrimes, need_for};
use crate::chunks::{Chunk, ChunkAllocator};
use crate::config::Geometry;
use crate::segment::SegmentSieve;

/// When a worker stops asking for more work.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stop {
    pub deadline: Option<Instant>,
    /// Exclusive upper bound on sieved values.
    pub limit: Option<u64>,
}

impl Stop {
    pub fn new(deadline: Option<Instant>, limit: Option<u64>) -> Self {
        Self { deadline, limit }
    }

    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Where sieving of `chunk` must end.
    fn end_of(&self, chunk: &Chunk) -> u64 {
        self.limit.map_or(chunk.high, |limit| chunk.high.min(limit))
    }
}

/// What one worker found. Owned by that worker until it returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialResult {
    pub prime_count: u64,
    /// 0 if this worker found no prime.
    pub largest_prime: u64,
    pub segments: u64,
    /// Chunks sieved to the end.
    pub chunks: u64,
    pub max_high: u64,
    pub bytes_touched: u64,
}

/// Pulls chunks from the shared allocator and sieves them segment by segment
/// until the deadline passes, the value limit is reached, or the allocator
/// runs dry.
///
/// Per chunk the worker runs PrepareBasePrimes -> SieveSegment ->
/// CountSegment for every segment, checking the deadline between segments.
/// A chunk interrupted by the deadline is abandoned; nobody finishes it.
pub struct SegmentSieveWorker<'a> {
    id: usize,
    table: &'a BasePrimeTable,
    chunks: &'a ChunkAllocator,
    segment_span: u64,
    stop: Stop,
    sieve: SegmentSieve,
    base: Arc<BasePrimes>,
    active: usize,
    result: PartialResult,
}

impl<'a> SegmentSieveWorker<'a> {
    pub fn new(
        id: usize,
        table: &'a BasePrimeTable,
        chunks: &'a ChunkAllocator,
        geometry: Geometry,
        stop: Stop,
    ) -> Self {
        Self {
            id,
            table,
            chunks,
            segment_span: geometry.segment_span,
            stop,
            sieve: SegmentSieve::new(geometry.segment_bits()),
            base: table.snapshot(),
            active: 0,
            result: PartialResult::default(),
        }
    }

    pub fn run(mut self) -> PartialResult {
        while let Some(chunk) = self.acquire_chunk() {
            if !self.sieve_chunk(chunk) {
                break;
            }
        }

        debug!(
            worker = self.id,
            primes = self.result.prime_count,
            largest = self.result.largest_prime,
            segments = self.result.segments,
            chunks = self.result.chunks,
            "worker finished"
        );
        self.result
    }

    fn acquire_chunk(&mut self) -> Option<Chunk> {
        let Some(chunk) = self.chunks.acquire() else {
            warn!(worker = self.id, "value range exhausted, stopping");
            return None;
        };
        if self.stop.expired() {
            return None;
        }
        if self.stop.limit.is_some_and(|limit| chunk.low >= limit) {
            return None;
        }
        Some(chunk)
    }

    /// Returns `false` if the deadline cut the chunk short.
    fn sieve_chunk(&mut self, chunk: Chunk) -> bool {
        // Cursors only carry across segments of one contiguous chunk
        self.sieve.reset_cursors();

        let end = self.stop.end_of(&chunk);
        let mut low = chunk.low;
        while low < end {
            let high = low.saturating_add(self.segment_span).min(end);

            self.prepare_base_primes(low, high);
            self.sieve.sieve(low, high, self.base.primes(), self.active);
            self.count_segment(low, high);

            low = high;
            if low < end && self.stop.expired() {
                debug!(worker = self.id, chunk = chunk.id, "deadline hit mid-chunk, abandoning");
                return false;
            }
        }

        self.result.chunks += 1;
        true
    }

    fn prepare_base_primes(&mut self, low: u64, high: u64) {
        let need = need_for(high);
        if need > self.base.sieved_to() {
            self.table.ensure(need);
            self.base = self.table.snapshot();
        }

        self.active = self.base.count_up_to(need);
        if self.active > self.sieve.cursor_count() {
            self.sieve
                .extend_cursors(&self.base.primes()[..self.active], low);
        }
    }

    fn count_segment(&mut self, low: u64, high: u64) {
        let result = &mut self.result;
        result.prime_count += self.sieve.count();
        if let Some(largest) = self.sieve.largest() {
            result.largest_prime = result.largest_prime.max(largest);
        }

        // 2 is outside the odd-only domain; only the segment holding it counts it
        if low <= 2 && 2 < high {
            result.prime_count += 1;
            result.largest_prime = result.largest_prime.max(2);
        }

        result.segments += 1;
        result.max_high = result.max_high.max(high);
        result.bytes_touched += self.sieve.byte_len() as u64;
    }
}
