//! Resource usage parsing for GNU time output
//!
//! The timing wrapper appends one line of the form `<elapsed> <max-rss-kb>`
//! (`%E %M`) to the program's stderr. Elapsed time is `[H:]M:SS[.cc]`.

use thiserror::Error;

/// Error that occurs while parsing the telemetry line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageParseError {
    #[error("no telemetry line in stderr")]
    Missing,

    #[error("malformed telemetry line {line:?}: {reason}")]
    Malformed { line: String, reason: String },
}

impl UsageParseError {
    fn malformed(line: &str, reason: impl Into<String>) -> Self {
        UsageParseError::Malformed {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Elapsed time and peak memory reported by the timing wrapper
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceUsage {
    /// Wall clock time in seconds
    pub elapsed: f64,
    /// Peak resident set size in kilobytes
    pub peak_memory_kb: u64,
}

impl ResourceUsage {
    /// Parse a `<elapsed> <kb>` telemetry line
    pub fn parse(line: &str) -> Result<Self, UsageParseError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [elapsed, memory] = tokens.as_slice() else {
            return Err(UsageParseError::malformed(
                line,
                format!("expected 2 fields, found {}", tokens.len()),
            ));
        };

        let elapsed = parse_elapsed(elapsed).ok_or_else(|| {
            UsageParseError::malformed(line, format!("invalid elapsed time '{elapsed}'"))
        })?;
        let peak_memory_kb = memory.parse().map_err(|_| {
            UsageParseError::malformed(line, format!("invalid memory figure '{memory}'"))
        })?;

        Ok(Self {
            elapsed,
            peak_memory_kb,
        })
    }

    /// Elapsed seconds rounded to 3 decimal places
    pub fn elapsed_seconds(&self) -> f64 {
        round3(self.elapsed)
    }

    /// Peak memory in megabytes rounded to 3 decimal places
    pub fn memory_mb(&self) -> f64 {
        round3(self.peak_memory_kb as f64 / 1024.0)
    }
}

/// Split the telemetry line off the end of stderr.
///
/// With several lines, the last one is telemetry and the rest is the
/// program's own error output. A single line is taken to be telemetry alone.
pub fn split_telemetry(stderr: &str) -> Result<(String, ResourceUsage), UsageParseError> {
    let lines: Vec<&str> = stderr.lines().collect();
    let Some((last, rest)) = lines.split_last() else {
        return Err(UsageParseError::Missing);
    };

    let usage = ResourceUsage::parse(last)?;
    Ok((rest.join("\n"), usage))
}

/// Convert `[H:]M:SS[.cc]` to seconds; the fraction is in hundredths
fn parse_elapsed(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (parse_digits(h)?, parse_digits(m)?, *s),
        [m, s] => (0, parse_digits(m)?, *s),
        _ => return None,
    };

    let (whole, hundredths) = match seconds.split_once('.') {
        Some((whole, frac)) => (parse_digits(whole)?, parse_digits(frac)?),
        None => (parse_digits(seconds)?, 0),
    };

    let total = hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(whole)?;
    Some(total as f64 + hundredths as f64 / 100.0)
}

fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
