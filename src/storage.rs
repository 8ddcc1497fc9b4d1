use chrono::Local;
use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::engine::RunReport;

const LOG_FILE: &str = "execution_log.txt";

/// `$XDG_DATA_HOME/nt-sieve`, falling back to `~/.local/share/nt-sieve`.
pub fn get_data_dir() -> io::Result<PathBuf> {
    let data_home = env::var("XDG_DATA_HOME")
        .ok()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".local/share"))
        })
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "could not determine data directory"))?;

    Ok(data_home.join("nt-sieve"))
}

/// Appends one line describing the run to the execution log.
pub fn log_execution(args: &str, report: &RunReport) -> io::Result<()> {
    let data_dir = get_data_dir()?;
    append_log_line(&data_dir, args, report)
}

fn append_log_line(data_dir: &Path, args: &str, report: &RunReport) -> io::Result<()> {
    fs::create_dir_all(data_dir)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join(LOG_FILE))?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");

    writeln!(
        file,
        "{} | sieve | {} | t{} | {} primes | max {} | {}us",
        timestamp,
        args,
        report.threads,
        report.totals.prime_count,
        report.totals.largest_prime,
        report.elapsed.as_micros()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduce::SieveTotals;
    use std::time::Duration;

    #[test]
    fn test_append_log_line() {
        let dir = env::temp_dir().join(format!("nt-sieve-log-{}", std::process::id()));
        let report = RunReport {
            totals: SieveTotals {
                prime_count: 25,
                largest_prime: 97,
                ..SieveTotals::default()
            },
            threads: 2,
            start: 2,
            elapsed: Duration::from_micros(1_234),
            chunks_issued: 1,
            base_ceiling: 100,
        };

        append_log_line(&dir, "limit=100", &report).unwrap();
        append_log_line(&dir, "limit=100", &report).unwrap();

        let content = fs::read_to_string(dir.join(LOG_FILE)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("| sieve | limit=100 | t2 | 25 primes | max 97 | 1234us"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
