use crate::worker::PartialResult;

/// Final answer of a run, folded from every worker's `PartialResult`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SieveTotals {
    pub prime_count: u64,
    /// 0 when no prime was found.
    pub largest_prime: u64,
    pub segments: u64,
    pub chunks: u64,
    /// Highest segment bound any worker sieved.
    pub max_high: u64,
    pub bytes_touched: u64,
    pub workers: usize,
}

impl SieveTotals {
    pub fn absorb(&mut self, partial: &PartialResult) {
        self.prime_count += partial.prime_count;
        self.largest_prime = self.largest_prime.max(partial.largest_prime);
        self.segments += partial.segments;
        self.chunks += partial.chunks;
        self.max_high = self.max_high.max(partial.max_high);
        self.bytes_touched += partial.bytes_touched;
        self.workers += 1;
    }
}

/// Sums counts and takes the maximum of largest primes. Only call this once
/// every worker has returned its result.
pub fn reduce(partials: &[PartialResult]) -> SieveTotals {
    partials.iter().collect()
}

impl<'a> FromIterator<&'a PartialResult> for SieveTotals {
    fn from_iter<I: IntoIterator<Item = &'a PartialResult>>(iter: I) -> Self {
        let mut totals = SieveTotals::default();
        for partial in iter {
            totals.absorb(partial);
        }
        totals
    }
}
