use regex::Regex;
use std::sync::LazyLock;

/// Fallback head-count when no usable number is found.
pub const DEFAULT_EMPLOYEES: u32 = 25;

static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)(?:\s*(mm|[kmb])\b)?").expect("static regex"));
static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("static regex"));
static FLOAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?|\.\d+").expect("static regex"));

// ── Normalizers ───────────────────────────────────────────────────────────────

/// Parse money with K/M/B suffixes.
/// "$45K" → 45,000 | "$1,000+" → 1,000 | "3m" → 3,000,000 | "$1.5MM" → 1,500,000 | "n/a" → 0
pub fn parse_currency_shorthand(s: &str) -> u64 {
    let cleaned = s.replace([',', '+'], "");

    let Some(caps) = CURRENCY_RE.captures(&cleaned) else {
        return 0;
    };
    let Ok(num) = caps[1].parse::<f64>() else {
        return 0;
    };

    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(ref m) if m == "K" => 1_000.0,
        Some(ref m) if m == "M" || m == "MM" => 1_000_000.0,
        Some(ref m) if m == "B" => 1_000_000_000.0,
        _ => 1.0,
    };

    // `as` saturates, so absurd inputs clamp instead of wrapping
    (num * multiplier) as u64
}

/// Collapse a head-count band into one estimate.
/// "10 - 49" → 29 | "250" → 250 | "" → 25
pub fn parse_employee_range(s: &str) -> u32 {
    let cleaned = s.replace(',', "");
    let nums: Vec<u64> = INTEGER_RE
        .find_iter(&cleaned)
        .filter_map(|m| m.as_str().parse().ok())
        .take(2)
        .collect();

    let estimate = match nums.as_slice() {
        [a, b] => a.midpoint(*b),
        [a] => *a,
        _ => return DEFAULT_EMPLOYEES,
    };

    match u32::try_from(estimate) {
        Ok(0) => DEFAULT_EMPLOYEES,
        Ok(n) => n,
        Err(_) => u32::MAX,
    }
}

/// First float-looking substring. "4.8 stars" → 4.8 | "no rating" → 0.0
pub fn parse_rating(s: &str) -> f64 {
    FLOAT_RE
        .find(s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Collapse runs of whitespace and trim.
pub fn normalise_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency_shorthand() {
        assert_eq!(parse_currency_shorthand("$45K"), 45_000);
        assert_eq!(parse_currency_shorthand("12,000"), 12_000);
        assert_eq!(parse_currency_shorthand("$10,000+"), 10_000);
        assert_eq!(parse_currency_shorthand("3m"), 3_000_000);
        assert_eq!(parse_currency_shorthand("1.5B"), 1_500_000_000);
        assert_eq!(parse_currency_shorthand("£2.5k"), 2_500);
    }

    #[test]
    fn test_parse_currency_spaced_and_doubled_suffix() {
        assert_eq!(parse_currency_shorthand("$1.5MM"), 1_500_000);
        assert_eq!(parse_currency_shorthand("$45 K"), 45_000);
        assert_eq!(parse_currency_shorthand("$2 mm+"), 2_000_000);
        assert_eq!(parse_currency_shorthand("$45K/hr"), 45_000);
        assert_eq!(parse_currency_shorthand("10 months"), 10);
        assert_eq!(parse_currency_shorthand("5 Key clients"), 5);
    }

    #[test]
    fn test_parse_currency_defaults_to_zero() {
        assert_eq!(parse_currency_shorthand("0"), 0);
        assert_eq!(parse_currency_shorthand(""), 0);
        assert_eq!(parse_currency_shorthand("Undisclosed"), 0);
        assert_eq!(parse_currency_shorthand("$"), 0);
    }

    #[test]
    fn test_parse_currency_uses_first_number() {
        assert_eq!(parse_currency_shorthand("$50 - $99 / hr"), 50);
        assert_eq!(parse_currency_shorthand("Min. project size $25K+"), 25_000);
        assert_eq!(parse_currency_shorthand("10 months"), 10);
    }

    #[test]
    fn test_parse_employee_range() {
        assert_eq!(parse_employee_range("10-49"), 29);
        assert_eq!(parse_employee_range("10 - 49 employees"), 29);
        assert_eq!(parse_employee_range("250"), 250);
        assert_eq!(parse_employee_range("1,000 - 9,999"), 5_499);
        assert_eq!(parse_employee_range("2 - 9 - 49"), 5);
    }

    #[test]
    fn test_parse_employee_range_defaults() {
        assert_eq!(parse_employee_range(""), DEFAULT_EMPLOYEES);
        assert_eq!(parse_employee_range("Freelancer"), DEFAULT_EMPLOYEES);
        assert_eq!(parse_employee_range("0"), DEFAULT_EMPLOYEES);
        assert_eq!(parse_employee_range("99999999999999"), u32::MAX);
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("4.8 stars"), 4.8);
        assert_eq!(parse_rating("5"), 5.0);
        assert_eq!(parse_rating("Rated .9"), 0.9);
        assert_eq!(parse_rating("no rating"), 0.0);
        assert_eq!(parse_rating("."), 0.0);
        assert_eq!(parse_rating(""), 0.0);
    }

    #[test]
    fn test_normalise_text() {
        assert_eq!(normalise_text("  Acme \n  Digital\t"), "Acme Digital");
        assert_eq!(normalise_text("   "), "");
    }
}
