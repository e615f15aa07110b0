//! Human-readable byte counts

const UNITS: [&str; 6] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Format `n` bytes with two decimals, e.g. `1.00 MiB`
#[must_use]
pub fn human_bytes(n: u64) -> String {
    human_bytes_with_precision(n, 2)
}

/// Format `n` bytes with the largest binary unit it reaches
///
/// Values below 1 KiB are printed as `"<n> bytes"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_bytes_with_precision(n: u64, precision: usize) -> String {
    if n < 1024 {
        return format!("{n} bytes");
    }

    let mut unit = 0;
    let mut threshold: u64 = 1024;
    while unit + 1 < UNITS.len() && n / 1024 >= threshold {
        threshold *= 1024;
        unit += 1;
    }

    let value = n as f64 / threshold as f64;
    format!("{value:.precision$} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values_are_bytes() {
        assert_eq!(human_bytes(0), "0 bytes");
        assert_eq!(human_bytes(1023), "1023 bytes");
    }

    #[test]
    fn test_unit_selection() {
        assert_eq!(human_bytes(1024), "1.00 KiB");
        assert_eq!(human_bytes(1_048_576), "1.00 MiB");
        assert_eq!(human_bytes(1_048_575), "1024.00 KiB");
        assert_eq!(human_bytes(3 * 1024 * 1024 * 1024 / 2), "1.50 GiB");
        assert_eq!(human_bytes(u64::MAX), "16.00 EiB");
    }

    #[test]
    fn test_precision() {
        assert_eq!(human_bytes_with_precision(1536, 0), "2 KiB");
        assert_eq!(human_bytes_with_precision(1536, 1), "1.5 KiB");
    }
}
