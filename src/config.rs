use std::time::Duration;

use crate::error::SieveError;

// Segment sizing: 16KB of flags keeps one segment resident in L1 next to the
// cursor array. One bit per odd value, so a segment spans twice its bit count.
pub const SEGMENT_BYTES: usize = 16 * 1024;
pub const SEGMENT_BITS: u64 = SEGMENT_BYTES as u64 * 8; // 131,072 odd values
pub const SEGMENT_SPAN: u64 = SEGMENT_BITS * 2; // 262,144 actual numbers
pub const CHUNK_SEGMENTS: u32 = 32;

/// First value handed out by the chunk allocator. Chunk 0 therefore owns the
/// value 2 and is the only chunk that counts it.
pub const FIRST_VALUE: u64 = 2;

pub const DEFAULT_SECONDS: f64 = 10.0;
pub const FALLBACK_THREADS: usize = 4;

/// Ceiling the shared base-prime table is bootstrapped to before workers start.
pub const BOOTSTRAP_CEILING: u32 = 100;

/// Highest segment bound the engine will sieve. Cursors look up to five
/// strides of `2p` (each below 2^33) past a segment bound, so the top of the
/// domain is kept free.
pub const VALUE_CEILING: u64 = u64::MAX - (1 << 36);

/// How the number line is cut into chunks and segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Values per segment (even, so every segment holds `span / 2` odd values).
    pub segment_span: u64,
    /// Segments per chunk.
    pub chunk_segments: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            segment_span: SEGMENT_SPAN,
            chunk_segments: CHUNK_SEGMENTS,
        }
    }
}

impl Geometry {
    pub fn new(segment_span: u64, chunk_segments: u32) -> Self {
        Self {
            segment_span,
            chunk_segments,
        }
    }

    /// Geometry whose segment flags occupy `kib` kilobytes.
    pub fn from_segment_kib(kib: u64, chunk_segments: u32) -> Self {
        Self::new(kib.saturating_mul(1024 * 8 * 2), chunk_segments)
    }

    /// Odd values (bits) per full segment.
    pub fn segment_bits(&self) -> usize {
        (self.segment_span / 2) as usize
    }

    pub fn chunk_span(&self) -> Option<u64> {
        self.segment_span.checked_mul(self.chunk_segments as u64)
    }

    pub fn validate(&self) -> Result<(), SieveError> {
        if self.segment_span == 0 || self.segment_span % 2 != 0 {
            return Err(SieveError::InvalidSegmentSpan(self.segment_span));
        }
        if self.chunk_segments == 0 {
            return Err(SieveError::NoChunkSegments);
        }
        match self.chunk_span() {
            Some(span) if span <= VALUE_CEILING => Ok(()),
            _ => Err(SieveError::ChunkSpanOverflow {
                segment_span: self.segment_span,
                chunk_segments: self.chunk_segments,
            }),
        }
    }
}

/// Everything a run of the engine needs to know.
#[derive(Debug, Clone)]
pub struct SieveConfig {
    pub threads: usize,
    /// Wall-clock budget. Workers stop at the first poll past it.
    pub duration: Option<Duration>,
    /// Exclusive upper bound on sieved values; makes the run deterministic.
    pub limit: Option<u64>,
    pub start: u64,
    pub geometry: Geometry,
    /// Interval of the progress monitor, if any.
    pub progress: Option<Duration>,
}

impl SieveConfig {
    /// A run bounded by a wall-clock budget only.
    pub fn timed(seconds: f64, threads: usize) -> Result<Self, SieveError> {
        Ok(Self {
            duration: Some(duration_from_secs(seconds)?),
            ..Self::base(threads)
        })
    }

    /// A run that sieves `[FIRST_VALUE, limit)` to completion.
    pub fn bounded(limit: u64, threads: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::base(threads)
        }
    }

    fn base(threads: usize) -> Self {
        Self {
            threads,
            duration: None,
            limit: None,
            start: FIRST_VALUE,
            geometry: Geometry::default(),
            progress: None,
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_progress(mut self, progress: Option<Duration>) -> Self {
        self.progress = progress;
        self
    }

    pub fn validate(&self) -> Result<(), SieveError> {
        if self.threads == 0 {
            return Err(SieveError::NoThreads);
        }
        self.geometry.validate()?;
        if self.start >= VALUE_CEILING {
            return Err(SieveError::StartOutOfRange(self.start));
        }
        if let Some(limit) = self.limit {
            if limit <= self.start {
                return Err(SieveError::EmptyRange {
                    start: self.start,
                    limit,
                });
            }
        }
        if self.duration.is_none() && self.limit.is_none() {
            return Err(SieveError::Unbounded);
        }
        Ok(())
    }
}

pub fn duration_from_secs(seconds: f64) -> Result<Duration, SieveError> {
    Duration::try_from_secs_f64(seconds).map_err(|_| SieveError::InvalidDuration(seconds))
}

/// Worker count when none is given: one per hardware thread.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_THREADS)
}
