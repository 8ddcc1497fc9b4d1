use crate::bits::BitBuffer;

/// Odd-only, bit-packed sieve over one segment at a time.
///
/// Owns the flag buffer and one cursor per base prime. A cursor holds the
/// next odd multiple of its prime still to be struck, so consecutive segments
/// never divide: they pick up where the previous segment stopped. Cursors are
/// indexed by the prime's position in the base table, which only ever
/// appends, so growth just extends the array.
///
/// - Bit `i` represents the odd value `first + 2*i`, `first = low | 1`
/// - Memory: one bit per odd value, fixed for the worker's lifetime
pub struct SegmentSieve {
    flags: BitBuffer,
    cursors: Vec<u64>,
    first: u64,
}

impl SegmentSieve {
    /// A sieve whose segments hold at most `segment_bits` odd values.
    pub fn new(segment_bits: usize) -> Self {
        Self {
            flags: BitBuffer::with_capacity(segment_bits),
            cursors: Vec::with_capacity(1 << 12),
            first: 1,
        }
    }

    /// Drops every cursor. They are only meaningful for a contiguous run of
    /// segments; the next `extend_cursors` recomputes them.
    pub fn reset_cursors(&mut self) {
        self.cursors.clear();
    }

    pub fn cursor_count(&self) -> usize {
        self.cursors.len()
    }

    /// Bytes of flag storage touched per segment.
    pub fn byte_len(&self) -> usize {
        self.flags.byte_len()
    }

    /// Starts cursors for `primes[self.cursor_count()..]` at the segment
    /// beginning at `low`. Existing cursors are kept.
    pub fn extend_cursors(&mut self, primes: &[u32], low: u64) {
        let first = low | 1;
        let start = self.cursors.len();
        self.cursors.extend(primes[start..].iter().map(|&p| {
            if p == 2 {
                // Never used: even values are not in the domain
                0
            } else {
                first_odd_multiple(p as u64, first)
            }
        }));
    }

    /// Sieves `[low, high)` with `primes[..active]`.
    ///
    /// Every prime in that prefix must already have a cursor, and together
    /// they must cover `sqrt(high - 1)`.
    pub fn sieve(&mut self, low: u64, high: u64, primes: &[u32], active: usize) {
        debug_assert!(active <= self.cursors.len());

        let first = low | 1;
        let len = odd_count(first, high);
        self.first = first;
        self.flags.reset(len);

        // 1 is odd but not prime
        if first == 1 && len > 0 {
            self.flags.clear(0);
        }

        let skip = usize::from(active > 0 && primes[0] == 2);
        for (cursor, &p) in self.cursors[skip..active]
            .iter_mut()
            .zip(&primes[skip..active])
        {
            let step = 2 * p as u64;
            let mut j = *cursor;

            // Catch up without dividing: big strides first, then single ones
            while j + 4 * step <= first {
                j += 4 * step;
            }
            while j < first {
                j += step;
            }

            // Mark odd multiples as composite, unrolled by 4
            while j + 3 * step < high {
                self.flags.clear(((j - first) >> 1) as usize);
                self.flags.clear(((j + step - first) >> 1) as usize);
                self.flags.clear(((j + 2 * step - first) >> 1) as usize);
                self.flags.clear(((j + 3 * step - first) >> 1) as usize);
                j += 4 * step;
            }
            while j < high {
                self.flags.clear(((j - first) >> 1) as usize);
                j += step;
            }

            *cursor = j;
        }
    }

    /// Odd primes in the last sieved segment.
    pub fn count(&self) -> u64 {
        self.flags.count_ones()
    }

    /// Largest odd prime in the last sieved segment.
    pub fn largest(&self) -> Option<u64> {
        self.flags
            .highest_set()
            .map(|idx| self.first + 2 * idx as u64)
    }

    /// Odd primes in the last sieved segment, ascending.
    #[cfg(test)]
    pub fn primes(&self) -> impl Iterator<Item = u64> + '_ {
        self.flags.ones().map(|idx| self.first + 2 * idx as u64)
    }

    #[cfg(test)]
    pub fn is_prime(&self, value: u64) -> bool {
        if value < self.first || value % 2 == 0 {
            return false;
        }
        let idx = ((value - self.first) >> 1) as usize;
        idx < self.flags.len() && self.flags.test(idx)
    }
}

/// Smallest odd multiple of `p` that is `>= first` and `>= p*p`.
///
/// The only division in the sieve; it runs once per prime per chunk.
fn first_odd_multiple(p: u64, first: u64) -> u64 {
    let square = p * p;
    if square >= first {
        return square;
    }
    let mut m = first.div_ceil(p) * p;
    if m % 2 == 0 {
        m += p; // Make it odd
    }
    m
}

/// Number of odd values in `[first, high)` where `first` is odd.
fn odd_count(first: u64, high: u64) -> usize {
    if high <= first {
        return 0;
    }
    (high - first).div_ceil(2) as usize
}
