use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::base_primes::BasePrimeTable;
use crate::chunks::ChunkAllocator;
use crate::config::{BOOTSTRAP_CEILING, SieveConfig};
use crate::error::SieveError;
use crate::reduce::{SieveTotals, reduce};
use crate::worker::{PartialResult, SegmentSieveWorker, Stop};

/// Outcome of one engine run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub totals: SieveTotals,
    pub threads: usize,
    pub start: u64,
    pub elapsed: Duration,
    pub chunks_issued: u64,
    pub base_ceiling: u32,
}

impl RunReport {
    /// Numbers per second over the span actually attempted.
    pub fn throughput(&self) -> f64 {
        let span = self.totals.max_high.saturating_sub(self.start) as f64;
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { span / secs } else { 0.0 }
    }
}

/// Runs `config.threads` workers over a fresh base-prime table and chunk
/// allocator, then folds their results.
///
/// The table and the allocator live on this stack frame and are lent to
/// scoped worker threads; nothing is process-global.
pub fn run(config: &SieveConfig) -> Result<RunReport, SieveError> {
    config.validate()?;
    let chunk_span = config
        .geometry
        .chunk_span()
        .ok_or(SieveError::ChunkSpanOverflow {
            segment_span: config.geometry.segment_span,
            chunk_segments: config.geometry.chunk_segments,
        })?;

    let table = BasePrimeTable::bootstrapped(BOOTSTRAP_CEILING);
    let chunks = ChunkAllocator::new(config.start, chunk_span);

    let started = Instant::now();
    let stop = Stop::new(config.duration.map(|d| started + d), config.limit);

    info!(
        threads = config.threads,
        seconds = config.duration.map(|d| d.as_secs_f64()),
        limit = config.limit,
        segment_span = config.geometry.segment_span,
        chunk_segments = config.geometry.chunk_segments,
        "starting sieve"
    );

    let done = AtomicBool::new(false);
    let partials = thread::scope(|scope| -> Result<Vec<PartialResult>, SieveError> {
        let mut handles = Vec::with_capacity(config.threads);
        for index in 0..config.threads {
            let worker = SegmentSieveWorker::new(index, &table, &chunks, config.geometry, stop);
            let handle = thread::Builder::new()
                .name(format!("sieve-worker-{index}"))
                .spawn_scoped(scope, move || worker.run())
                .map_err(|source| SieveError::Spawn { index, source })?;
            handles.push(handle);
        }

        let monitor = config.progress.filter(|d| !d.is_zero()).and_then(|interval| {
            let (done, chunks) = (&done, &chunks);
            thread::Builder::new()
                .name("sieve-progress".to_string())
                .spawn_scoped(scope, move || monitor_progress(interval, started, done, chunks))
                .map_err(|e| warn!(error = %e, "progress monitor unavailable"))
                .ok()
        });

        let joined: Result<Vec<_>, _> = handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| handle.join().map_err(|_| SieveError::WorkerPanicked(index)))
            .collect();

        done.store(true, Ordering::Release);
        if let Some(monitor) = monitor {
            monitor.thread().unpark();
        }
        joined
    })?;

    let elapsed = started.elapsed();
    let totals = reduce(&partials);

    debug!(
        chunks_issued = chunks.issued(),
        frontier = chunks.frontier(),
        base_ceiling = table.sieved_to(),
        "all workers joined"
    );
    info!(
        primes = totals.prime_count,
        largest = totals.largest_prime,
        elapsed_ms = elapsed.as_millis() as u64,
        "sieve finished"
    );

    Ok(RunReport {
        totals,
        threads: config.threads,
        start: config.start,
        elapsed,
        chunks_issued: chunks.issued(),
        base_ceiling: table.sieved_to(),
    })
}

fn monitor_progress(interval: Duration, started: Instant, done: &AtomicBool, chunks: &ChunkAllocator) {
    loop {
        thread::park_timeout(interval);
        if done.load(Ordering::Acquire) {
            return;
        }
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            chunks_issued = chunks.issued(),
            frontier = chunks.frontier(),
            "progress"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Geometry;
    use crate::testutil::reference_primes;
    use proptest::prelude::*;

    fn bounded(limit: u64, threads: usize, geometry: Geometry) -> SieveTotals {
        let config = SieveConfig::bounded(limit, threads).with_geometry(geometry);
        run(&config).unwrap().totals
    }

    #[test]
    fn test_primes_below_100() {
        for threads in [1, 2, 4] {
            let totals = bounded(100, threads, Geometry::new(8, 2));
            assert_eq!(totals.prime_count, 25);
            assert_eq!(totals.largest_prime, 97);
        }
    }

    #[test]
    fn test_primes_below_1000() {
        for threads in [1, 3, 8] {
            let totals = bounded(1000, threads, Geometry::new(32, 3));
            assert_eq!(totals.prime_count, 168);
            assert_eq!(totals.largest_prime, 997);
        }
    }

    #[test]
    fn test_single_and_multi_worker_agree() {
        let geometry = Geometry::new(1 << 10, 4);
        let one = bounded(2_000_000, 1, geometry);
        let many = bounded(2_000_000, 6, geometry);
        assert_eq!(one.prime_count, many.prime_count);
        assert_eq!(one.largest_prime, many.largest_prime);
        assert_eq!(one.max_high, many.max_high);
        assert_eq!(one.segments, many.segments);
        assert_eq!(one.prime_count, 148_933);
        assert_eq!(one.largest_prime, 1_999_993);
    }

    #[test]
    fn test_default_geometry_ten_million() {
        let totals = bounded(10_000_000, 4, Geometry::default());
        assert_eq!(totals.prime_count, 664_579);
        assert_eq!(totals.largest_prime, 9_999_991);
        assert_eq!(totals.max_high, 10_000_000);
    }

    #[test]
    fn test_two_counted_once_across_threads_and_widths() {
        for threads in [1, 2, 5] {
            for span in [2, 4, 6, 10, 64] {
                let totals = bounded(50, threads, Geometry::new(span, 1));
                assert_eq!(totals.prime_count, 15, "threads {} span {}", threads, span);
            }
        }
    }

    #[test]
    fn test_tiny_chunks_do_not_drop_or_double_count() {
        // Chunk span far below the prime gaps around 1e5
        let totals = bounded(200_000, 4, Geometry::new(2, 3));
        assert_eq!(totals.prime_count, reference_primes(200_000).len() as u64);
        assert_eq!(totals.largest_prime, 199_999);
    }

    #[test]
    fn test_start_past_two() {
        let config = SieveConfig::bounded(100, 2)
            .with_start(3)
            .with_geometry(Geometry::new(10, 2));
        let totals = run(&config).unwrap().totals;
        assert_eq!(totals.prime_count, 24);
    }

    #[test]
    fn test_timed_run_terminates() {
        let config = SieveConfig::timed(0.2, 2)
            .unwrap()
            .with_geometry(Geometry::new(1 << 12, 8))
            .with_progress(Some(Duration::from_millis(50)));
        let report = run(&config).unwrap();

        // Totals depend on timing; only sanity is checked
        assert!(report.elapsed >= Duration::from_millis(200));
        assert!(report.totals.segments > 0);
        assert!(report.totals.prime_count > 0);
        assert!(report.chunks_issued >= report.totals.chunks);
        assert!(report.throughput() > 0.0);
    }

    #[test]
    fn test_limit_and_deadline_together() {
        let config = SieveConfig::timed(30.0, 2)
            .unwrap()
            .with_limit(Some(100_000))
            .with_geometry(Geometry::new(1 << 10, 2));
        let report = run(&config).unwrap();
        assert_eq!(report.totals.prime_count, 9_592);
        assert!(report.elapsed < Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SieveConfig::bounded(100, 0);
        assert!(matches!(run(&config), Err(SieveError::NoThreads)));

        let config = SieveConfig::bounded(100, 1).with_geometry(Geometry::new(9, 1));
        assert!(matches!(run(&config), Err(SieveError::InvalidSegmentSpan(9))));
    }

    #[test]
    fn test_base_table_covers_run() {
        let config = SieveConfig::bounded(1_000_000, 2).with_geometry(Geometry::new(1 << 12, 4));
        let report = run(&config).unwrap();
        assert!(report.base_ceiling as u64 * report.base_ceiling as u64 >= 999_999);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_matches_reference(
            limit in 3_u64..60_000,
            half_span in 1_u64..600,
            chunk_segments in 1_u32..6,
            threads in 1_usize..5,
        ) {
            let totals = bounded(limit, threads, Geometry::new(half_span * 2, chunk_segments));
            let expected = reference_primes(limit);
            prop_assert_eq!(totals.prime_count, expected.len() as u64);
            prop_assert_eq!(totals.largest_prime, expected.last().copied().unwrap_or(0));
        }
    }
}
