//! Trusted reference for cross-checking the segmented engine.

/// Basic Sieve of Eratosthenes: every prime `< limit`.
///
/// One byte per number, evens included, no segmentation. Slow and simple on
/// purpose.
pub fn reference_primes(limit: u64) -> Vec<u64> {
    if limit < 3 {
        return vec![];
    }

    let limit = limit as usize;
    let mut is_prime = vec![true; limit];
    is_prime[0] = false;
    is_prime[1] = false;

    let mut i = 2;
    while i * i < limit {
        if is_prime[i] {
            let mut j = i * i;
            while j < limit {
                is_prime[j] = false;
                j += i;
            }
        }
        i += 1;
    }

    is_prime
        .iter()
        .enumerate()
        .filter_map(|(num, &prime)| if prime { Some(num as u64) } else { None })
        .collect()
}

/// Primes in `[low, high)` by the reference sieve.
pub fn reference_primes_in(low: u64, high: u64) -> Vec<u64> {
    reference_primes(high)
        .into_iter()
        .filter(|&p| p >= low)
        .collect()
}

#[test]
fn test_reference_small() {
    assert_eq!(reference_primes(0), Vec::<u64>::new());
    assert_eq!(reference_primes(2), Vec::<u64>::new());
    assert_eq!(reference_primes(3), vec![2]);
    assert_eq!(reference_primes(12), vec![2, 3, 5, 7, 11]);
    assert_eq!(reference_primes(100).len(), 25);
    assert_eq!(reference_primes(1000).len(), 168);
    assert_eq!(reference_primes_in(10, 30), vec![11, 13, 17, 19, 23, 29]);
}
