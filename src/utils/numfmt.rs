//! Number and age phrasing for highlight messages. The output is part of the
//! library's stable surface: identical inputs must format identically down to
//! the byte.

/// Format a count with `k`/`m` suffixes, one decimal at most, trailing zeros
/// trimmed: `950` → `"950"`, `1500` → `"1.5k"`, `50000` → `"50k"`,
/// `1_200_000` → `"1.2m"`.
#[allow(clippy::cast_precision_loss)]
pub fn fmt_count(value: u64) -> String {
    if value >= 1_000_000 {
        fmt_scaled(value as f64 / 1_000_000.0, "m")
    } else if value >= 1_000 {
        fmt_scaled(value as f64 / 1_000.0, "k")
    } else {
        value.to_string()
    }
}

fn fmt_scaled(scaled: f64, suffix: &str) -> String {
    let tenths = (scaled * 10.0).round() / 10.0;
    if (tenths - tenths.trunc()).abs() < f64::EPSILON {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = tenths.trunc() as u64;
        format!("{whole}{suffix}")
    } else {
        format!("{tenths:.1}{suffix}")
    }
}

/// Human age phrase with bucketed precision: ≥5y whole years, ≥2y one-decimal
/// years, ≥1y months, ≥8w months, otherwise weeks.
pub fn fmt_age_weeks(age_weeks: f64) -> String {
    let years = age_weeks / 52.0;
    if years >= 5.0 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = years.round() as i64;
        format!("{whole} years")
    } else if years >= 2.0 {
        format!("{years:.1} years")
    } else if years >= 1.0 || age_weeks >= 8.0 {
        #[allow(clippy::cast_possible_truncation)]
        let months = (age_weeks * 12.0 / 52.0).round().max(1.0) as i64;
        plural(months, "month")
    } else {
        #[allow(clippy::cast_possible_truncation)]
        let weeks = age_weeks.round().max(1.0) as i64;
        plural(weeks, "week")
    }
}

/// `1 week` / `3 weeks`.
pub fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_below_one_thousand_are_verbatim() {
        assert_eq!(fmt_count(0), "0");
        assert_eq!(fmt_count(950), "950");
    }

    #[test]
    fn thousands_get_a_k_suffix_with_trimmed_zeros() {
        assert_eq!(fmt_count(1_000), "1k");
        assert_eq!(fmt_count(1_500), "1.5k");
        assert_eq!(fmt_count(50_000), "50k");
        assert_eq!(fmt_count(49_940), "49.9k");
    }

    #[test]
    fn millions_get_an_m_suffix() {
        assert_eq!(fmt_count(1_000_000), "1m");
        assert_eq!(fmt_count(1_200_000), "1.2m");
    }

    #[test]
    fn age_buckets_step_down_in_precision() {
        assert_eq!(fmt_age_weeks(52.0 * 7.0), "7 years");
        assert_eq!(fmt_age_weeks(52.0 * 2.5), "2.5 years");
        assert_eq!(fmt_age_weeks(60.0), "14 months");
        assert_eq!(fmt_age_weeks(10.0), "2 months");
        assert_eq!(fmt_age_weeks(3.2), "3 weeks");
        assert_eq!(fmt_age_weeks(0.9), "1 week");
    }

    #[test]
    fn plural_handles_exactly_one() {
        assert_eq!(plural(1, "release"), "1 release");
        assert_eq!(plural(4, "release"), "4 releases");
    }
}
