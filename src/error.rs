use thiserror::Error;

/// Errors surfaced by configuring or running the sieve engine.
///
/// Steady-state sieving itself has no recoverable failures; everything here is
/// either a rejected configuration or a fault in the thread pool.
#[derive(Error, Debug)]
pub enum SieveError {
    #[error("thread count must be at least 1")]
    NoThreads,

    #[error("run duration must be a finite, non-negative number of seconds (got {0})")]
    InvalidDuration(f64),

    #[error("segment span must be a positive even number of values (got {0})")]
    InvalidSegmentSpan(u64),

    #[error("chunk must contain at least one segment")]
    NoChunkSegments,

    #[error("chunk span {segment_span} x {chunk_segments} overflows the value domain")]
    ChunkSpanOverflow { segment_span: u64, chunk_segments: u32 },

    #[error("limit {limit} must be greater than the start value {start}")]
    EmptyRange { start: u64, limit: u64 },

    #[error("run needs a deadline, a value limit, or both")]
    Unbounded,

    #[error("start value {0} is past the sievable value ceiling")]
    StartOutOfRange(u64),

    #[error("failed to spawn worker thread {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("worker thread {0} panicked")]
    WorkerPanicked(usize),
}
