use std::fmt::Write;

use crate::engine::RunReport;

/// Renders the end-of-run summary printed on stdout.
pub fn render(report: &RunReport) -> String {
    let totals = &report.totals;
    let secs = report.elapsed.as_secs_f64();
    let largest = if totals.largest_prime == 0 {
        "none".to_string()
    } else {
        grouped(totals.largest_prime)
    };

    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(out, "Threads: {}", report.threads);
    let _ = writeln!(out, "Primes found: {}", grouped(totals.prime_count));
    let _ = writeln!(out, "Largest prime found: {}", largest);
    let _ = writeln!(out, "Final N processed: {}", grouped(totals.max_high));
    let _ = writeln!(out, "Segments processed: {}", grouped(totals.segments));
    let _ = writeln!(
        out,
        "Approx bytes touched: {} ({:.1} MiB)",
        grouped(totals.bytes_touched),
        totals.bytes_touched as f64 / (1024.0 * 1024.0)
    );
    let _ = writeln!(out, "Time: {:.3} s", secs);
    let _ = write!(
        out,
        "Rate: {:.2} million numbers/s",
        report.throughput() / 1_000_000.0
    );
    out
}

/// Formats `n` with a comma between every group of three digits.
pub fn grouped(n: u64) -> String {
    let mut buf = itoa::Buffer::new();
    let digits = buf.format(n).as_bytes();

    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, &digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduce::SieveTotals;
    use std::time::Duration;

    fn report(totals: SieveTotals, elapsed: Duration) -> RunReport {
        RunReport {
            totals,
            threads: 4,
            start: 2,
            elapsed,
            chunks_issued: totals.chunks,
            base_ceiling: 3_162,
        }
    }

    #[test]
    fn test_grouped() {
        assert_eq!(grouped(0), "0");
        assert_eq!(grouped(999), "999");
        assert_eq!(grouped(1_000), "1,000");
        assert_eq!(grouped(664_579), "664,579");
        assert_eq!(grouped(10_000_000), "10,000,000");
        assert_eq!(grouped(u64::MAX), "18,446,744,073,709,551,615");
    }

    #[test]
    fn test_render() {
        let totals = SieveTotals {
            prime_count: 664_579,
            largest_prime: 9_999_991,
            segments: 39,
            chunks: 2,
            max_high: 10_000_002,
            bytes_touched: 2 * 1024 * 1024,
            workers: 4,
        };
        let text = render(&report(totals, Duration::from_millis(500)));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            [
                "Threads: 4",
                "Primes found: 664,579",
                "Largest prime found: 9,999,991",
                "Final N processed: 10,000,002",
                "Segments processed: 39",
                "Approx bytes touched: 2,097,152 (2.0 MiB)",
                "Time: 0.500 s",
                "Rate: 20.00 million numbers/s",
            ]
        );
    }

    #[test]
    fn test_render_empty_run() {
        let text = render(&report(SieveTotals::default(), Duration::ZERO));
        assert!(text.contains("Primes found: 0\n"));
        assert!(text.contains("Largest prime found: none\n"));
        assert!(text.ends_with("Rate: 0.00 million numbers/s"));
    }
}
