//! Unit formatting helpers.
//!
//! Binary-prefix scaling in steps of 1024. Values are carried as integer
//! hundredths so displayed digits truncate instead of rounding, which keeps
//! readouts stable while a counter climbs through a unit boundary.

const BYTE_UNITS: [&str; 6] = ["Byte", "KiB", "MiB", "GiB", "TiB", "PiB"];
const BIT_UNITS: [&str; 6] = ["bit", "Kib", "Mib", "Gib", "Tib", "Pib"];

/// Bytes scaled to the highest fitting unit, e.g. `976.5 KiB`.
pub fn human_bytes(value: u64) -> String {
    scale(value, 1, &BYTE_UNITS, "")
}

/// Bytes per second, e.g. `976.5 KiB/s`.
pub fn human_byte_rate(value: u64) -> String {
    scale(value, 1, &BYTE_UNITS, "/s")
}

/// Bits per second, e.g. `7.62 Mibps`.
pub fn human_bit_rate(value: u64) -> String {
    scale(value, 8, &BIT_UNITS, "ps")
}

/// Seconds of uptime as `3d 4:05:06` or `4:05:06`.
pub fn uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let h = secs % 86_400 / 3600;
    let m = secs % 3600 / 60;
    let s = secs % 60;
    if days > 0 {
        format!("{days}d {h}:{m:02}:{s:02}")
    } else {
        format!("{h}:{m:02}:{s:02}")
    }
}

/// Seconds of process runtime as `mm:ss`, `h:mm:ss` or `3d 4:05`.
pub fn elapsed(secs: u64) -> String {
    let days = secs / 86_400;
    let h = secs % 86_400 / 3600;
    let m = secs % 3600 / 60;
    let s = secs % 60;
    if days > 0 {
        format!("{days}d {h}:{m:02}")
    } else if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// CPU frequency in MHz, switching to GHz from 1000 MHz up.
pub fn frequency(mhz: f64) -> String {
    if mhz >= 1000.0 {
        format!("{:.2} GHz", mhz / 1000.0)
    } else {
        format!("{mhz:.0} MHz")
    }
}

/// Scales `value * mult` into `units`, appending `suffix` to the unit.
///
/// Two decimals below 10, one above, none for the base unit.
fn scale(value: u64, mult: u64, units: &[&str; 6], suffix: &str) -> String {
    // Hundredths, so the fraction survives the shifts.
    let mut v = value as u128 * 100 * mult as u128;
    let mut idx = 0;
    while v >= 100_000 && idx < units.len() - 1 {
        v >>= 10;
        idx += 1;
    }

    let whole = v / 100;
    let frac = v % 100;
    let number = if idx == 0 {
        format!("{whole}")
    } else if whole < 10 {
        format!("{whole}.{frac:02}")
    } else {
        format!("{whole}.{}", frac / 10)
    };
    format!("{number} {}{suffix}", units[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_rate_binary_prefix() {
        // 1_000_000 B/s is 976.5625 KiB/s; digits truncate.
        assert_eq!(human_byte_rate(1_000_000), "976.5 KiB/s");
    }

    #[test]
    fn bit_rate_binary_prefix() {
        // 8_000_000 bit/s is 7.629… Mib/s.
        assert_eq!(human_bit_rate(1_000_000), "7.62 Mibps");
    }

    #[test]
    fn base_unit_has_no_decimals() {
        assert_eq!(human_bytes(0), "0 Byte");
        assert_eq!(human_bytes(512), "512 Byte");
    }

    #[test]
    fn unit_boundaries() {
        assert_eq!(human_bytes(1024), "1.00 KiB");
        assert_eq!(human_bytes(1024 * 1024), "1.00 MiB");
        assert_eq!(human_bytes(10 * 1024 * 1024), "10.0 MiB");
    }

    #[test]
    fn uptime_forms() {
        assert_eq!(uptime(59), "0:00:59");
        assert_eq!(uptime(3661), "1:01:01");
        assert_eq!(uptime(90_061), "1d 1:01:01");
    }

    #[test]
    fn elapsed_forms() {
        assert_eq!(elapsed(59), "00:59");
        assert_eq!(elapsed(3661), "1:01:01");
        assert_eq!(elapsed(172_800 + 3600), "2d 1:00");
    }

    #[test]
    fn frequency_forms() {
        assert_eq!(frequency(800.0), "800 MHz");
        assert_eq!(frequency(3800.0), "3.80 GHz");
    }
}
