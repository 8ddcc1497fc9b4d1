/// Bit-packed primality flags for one segment of odd values.
///
/// Bit `i` stands for the odd value `first + 2*i` of whatever segment the
/// owner is sieving. The buffer keeps a fixed capacity for its whole life and
/// only the first `len` bits are live after a `reset(len)`; every bit past
/// `len` stays zero so whole-word counting never sees stale flags.
pub struct BitBuffer {
    words: Vec<u64>,
    len: usize,
}

impl BitBuffer {
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: vec![0_u64; bits.div_ceil(64)],
            len: 0,
        }
    }

    /// Capacity in bits.
    pub fn capacity(&self) -> usize {
        self.words.len() * 64
    }

    /// Number of live bits since the last reset.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Size of the backing storage in bytes.
    pub fn byte_len(&self) -> usize {
        self.words.len() * 8
    }

    /// Marks the first `len` bits as "prime" and everything after as cleared.
    pub fn reset(&mut self, len: usize) {
        debug_assert!(len <= self.capacity());
        let full = len / 64;
        let tail = len % 64;

        self.words[..full].fill(!0_u64);
        if full < self.words.len() {
            self.words[full] = if tail == 0 { 0 } else { (1_u64 << tail) - 1 };
            self.words[full + 1..].fill(0);
        }
        self.len = len;
    }

    #[inline]
    pub fn clear(&mut self, idx: usize) {
        self.words[idx >> 6] &= !(1_u64 << (idx & 63));
    }

    #[cfg(test)]
    #[inline]
    pub fn test(&self, idx: usize) -> bool {
        (self.words[idx >> 6] >> (idx & 63)) & 1 != 0
    }

    /// Population count over the live bits.
    pub fn count_ones(&self) -> u64 {
        let live = self.len.div_ceil(64);
        let mut chunks = self.words[..live].chunks_exact(4);
        let mut total = 0_u64;

        // Unrolled by four, the remainder handled word by word
        for quad in &mut chunks {
            total += quad[0].count_ones() as u64
                + quad[1].count_ones() as u64
                + quad[2].count_ones() as u64
                + quad[3].count_ones() as u64;
        }
        for word in chunks.remainder() {
            total += word.count_ones() as u64;
        }
        total
    }

    /// Index of the highest set bit, scanning backwards from the end.
    pub fn highest_set(&self) -> Option<usize> {
        let live = self.len.div_ceil(64);
        self.words[..live]
            .iter()
            .rposition(|&word| word != 0)
            .map(|word_idx| word_idx * 64 + 63 - self.words[word_idx].leading_zeros() as usize)
    }

    /// Iterates the indices of set bits in increasing order.
    #[cfg(test)]
    pub fn ones(&self) -> Ones<'_> {
        let words = &self.words[..self.len.div_ceil(64)];
        Ones {
            words,
            word_idx: 0,
            word: words.first().copied().unwrap_or(0),
        }
    }
}

#[cfg(test)]
pub struct Ones<'a> {
    words: &'a [u64],
    word_idx: usize,
    word: u64,
}

#[cfg(test)]
impl Iterator for Ones<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.word == 0 {
            self.word_idx += 1;
            if self.word_idx >= self.words.len() {
                return None;
            }
            self.word = self.words[self.word_idx];
        }
        let bit_idx = self.word.trailing_zeros() as usize;
        self.word &= self.word - 1; // Clear the lowest set bit
        Some(self.word_idx * 64 + bit_idx)
    }
}
