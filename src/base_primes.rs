use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

/// An immutable, complete list of the primes up to `sieved_to`.
///
/// Workers hold one of these behind an `Arc` and sieve from it without ever
/// touching the shared table again until a segment needs a larger ceiling.
#[derive(Debug, Default)]
pub struct BasePrimes {
    primes: Vec<u32>,
    sieved_to: u32,
}

impl BasePrimes {
    pub fn primes(&self) -> &[u32] {
        &self.primes
    }

    /// Inclusive bound up to which `primes` is complete.
    pub fn sieved_to(&self) -> u32 {
        self.sieved_to
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.primes.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    /// Number of primes `<= need`.
    pub fn count_up_to(&self, need: u32) -> usize {
        self.primes.partition_point(|&p| p <= need)
    }
}

/// Shared, grow-only table of base primes.
///
/// Reads of the ceiling are a single atomic load. Growth is serialized by
/// `growth` and publishes a fresh `BasePrimes` in one pointer swap, so a
/// reader sees either the old list or the new one, never a partial list.
pub struct BasePrimeTable {
    sieved_to: AtomicU32,
    current: RwLock<Arc<BasePrimes>>,
    growth: Mutex<()>,
}

impl Default for BasePrimeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BasePrimeTable {
    /// An empty table. Nothing is known prime yet, so the ceiling is 1.
    pub fn new() -> Self {
        Self {
            sieved_to: AtomicU32::new(1),
            current: RwLock::new(Arc::new(BasePrimes {
                primes: Vec::new(),
                sieved_to: 1,
            })),
            growth: Mutex::new(()),
        }
    }

    pub fn bootstrapped(ceiling: u32) -> Self {
        let table = Self::new();
        table.ensure(ceiling);
        table
    }

    pub fn sieved_to(&self) -> u32 {
        self.sieved_to.load(Ordering::Acquire)
    }

    /// The current list. Cheap: one shared-lock acquisition and an `Arc` clone.
    pub fn snapshot(&self) -> Arc<BasePrimes> {
        Arc::clone(&self.current.read())
    }

    /// Guarantees every prime `<= need` is in the table.
    ///
    /// Returns `true` if this call grew the table. The new ceiling is
    /// `max(need, 2 * sieved_to)`, saturating at `u32::MAX`, so a run that
    /// creeps upward one segment at a time only regrows logarithmically often.
    pub fn ensure(&self, need: u32) -> bool {
        if need <= self.sieved_to.load(Ordering::Acquire) {
            return false;
        }

        let _guard = self.growth.lock();

        // Another worker may have grown the table while we waited
        let sieved_to = self.sieved_to.load(Ordering::Acquire);
        if need <= sieved_to {
            return false;
        }

        let target = need.max(sieved_to.saturating_mul(2));
        let previous = self.snapshot();
        let primes = sieve_base(target, previous.primes());

        debug!(
            from = sieved_to,
            to = target,
            primes = primes.len(),
            "grew base prime table"
        );

        *self.current.write() = Arc::new(BasePrimes {
            primes,
            sieved_to: target,
        });
        self.sieved_to.store(target, Ordering::Release);
        true
    }
}

/// Largest base prime a segment ending (exclusively) at `high` can need.
///
/// `isqrt` of any `u64` fits in a `u32`, so the cast cannot truncate.
pub fn need_for(high: u64) -> u32 {
    if high <= 1 {
        return 0;
    }
    (high - 1).isqrt() as u32
}

/// Odd-only Sieve of Eratosthenes over `[0, limit]`.
///
/// `seeds` is a complete, sorted prime list for some smaller ceiling; its odd
/// members strike first so the scan for new strikers starts past them.
/// Index mapping: `is_prime[i]` represents the number `2*i + 3`.
pub fn sieve_base(limit: u32, seeds: &[u32]) -> Vec<u32> {
    if limit < 2 {
        return vec![];
    }

    let limit = limit as u64;
    let size = ((limit - 1) / 2) as usize;
    let mut is_prime = vec![true; size];
    let root = limit.isqrt();

    #[inline]
    fn strike(is_prime: &mut [bool], p: u64) {
        let mut j = ((p * p - 3) / 2) as usize;
        while j < is_prime.len() {
            is_prime[j] = false;
            j += p as usize;
        }
    }

    let mut scan_from = 3_u64;
    for &p in seeds.iter().skip_while(|&&p| p == 2) {
        let p = p as u64;
        if p > root {
            break;
        }
        strike(&mut is_prime, p);
        scan_from = p + 2;
    }

    let mut p = scan_from;
    while p <= root {
        if is_prime[((p - 3) / 2) as usize] {
            strike(&mut is_prime, p);
        }
        p += 2;
    }

    let mut primes = Vec::new();
    if limit > 16 {
        // pi(x) < 1.26 x / ln x
        let lf = limit as f64;
        primes.reserve((1.26 * lf / lf.ln()) as usize);
    }
    primes.push(2);
    primes.extend(
        is_prime
            .iter()
            .enumerate()
            .filter(|&(_, &flag)| flag)
            .map(|(i, _)| (2 * i + 3) as u32),
    );
    primes
}
