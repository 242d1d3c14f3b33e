//! Presentational number formatting.
//!
//! Shared by the chart-blob writer and the filter formatters. Formatting is
//! display-only: filter selection and ordering always operate on raw values.

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format an integer with thousands separators: `1234567` -> `"1,234,567"`.
#[must_use]
pub fn group_int(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    let mut remaining = digits.len();
    for ch in digits.chars() {
        out.push(ch);
        remaining -= 1;
        if remaining > 0 && remaining % 3 == 0 {
            out.push(',');
        }
    }
    if negative { format!("-{out}") } else { out }
}

/// Format a float rounded to two decimals with thousands separators, with
/// trailing zeros trimmed: `1234.5` -> `"1,234.5"`, `1234.0` -> `"1,234"`.
#[must_use]
pub fn group_float(value: f64) -> String {
    let rounded = round2(value);
    let negative = rounded < 0.0;
    let abs = rounded.abs();
    let int_part = abs.trunc() as i64;
    let mut out = group_int(int_part);
    let frac = format!("{:.2}", abs.fract());
    let frac = frac.trim_start_matches("0.").trim_end_matches('0');
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    if negative { format!("-{out}") } else { out }
}

/// Scale to millions with an `M` suffix: `1_234_560.0` -> `"1.23 M"`.
#[must_use]
pub fn millions(value: f64) -> String {
    format!("{} M", group_float(value / 1e6))
}

/// Scale to billions with a `B` suffix.
#[must_use]
pub fn billions(value: f64) -> String {
    format!("{} B", group_float(value / 1e9))
}

/// Scale to billions rounded to the nearest whole unit: `"12 B"`.
#[must_use]
pub fn billions_whole(value: f64) -> String {
    format!("{} B", group_int((value / 1e9).round() as i64))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0, "0")]
    #[test_case(999, "999")]
    #[test_case(1_000, "1,000")]
    #[test_case(1_234_567, "1,234,567"; "positive_millions")]
    #[test_case(-1_234_567, "-1,234,567"; "negative_millions")]
    fn grouping_integers(value: i64, expected: &str) {
        assert_eq!(group_int(value), expected);
    }

    #[test_case(1234.5, "1,234.5")]
    #[test_case(1234.0, "1,234")]
    #[test_case(1234.567, "1,234.57")]
    #[test_case(-0.25, "-0.25")]
    #[test_case(0.0, "0")]
    fn grouping_floats(value: f64, expected: &str) {
        assert_eq!(group_float(value), expected);
    }

    #[test]
    fn scaling() {
        assert_eq!(millions(1_500_000.0), "1.5 M");
        assert_eq!(billions(2_340_000_000.0), "2.34 B");
        assert_eq!(billions_whole(12_400_000_000.0), "12 B");
    }

    #[test]
    fn round2_behaves() {
        assert_eq!(round2(1.005), 1.0); // binary representation rounds down
        assert_eq!(round2(2.675_4), 2.68);
    }
}
