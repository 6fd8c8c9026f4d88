use std::sync::LazyLock;

use regex::Regex;

/// Duration value meaning "never expires".
pub const PERMANENT: i64 = -1;

pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
pub const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
/// 30.4375 days.
pub const SECONDS_PER_MONTH: i64 = 2_629_800;
/// 365.25 days, exactly twelve months.
pub const SECONDS_PER_YEAR: i64 = 31_557_600;

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^((\d+)\s?(years?|y))?[,\s]*((\d+)\s?(months?|mo))?[,\s]*((\d+)\s?(days?|d))?[,\s]*((\d+)\s?(hours?|h))?[,\s]*((\d+)\s?(minutes?|m))?[,\s]*((\d+)\s?(seconds?|s))?$",
    )
    .expect("duration pattern is a valid regex")
});

/// Capture group of each unit's number, paired with its length in seconds.
const UNIT_GROUPS: [(usize, i64); 6] = [
    (2, SECONDS_PER_YEAR),
    (5, SECONDS_PER_MONTH),
    (8, SECONDS_PER_DAY),
    (11, SECONDS_PER_HOUR),
    (14, SECONDS_PER_MINUTE),
    (17, 1),
];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid duration `{0}`")]
    Invalid(String),
}

/// Outcome of the duration field of the moderation context-menu modals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanctionInput {
    /// The revoke keyword ("Unban" / "Unmute") was entered.
    Revoke,
    Apply(i64),
}

/// Parse a human duration such as `2d 3h` or `1 year, 2 months` into seconds.
///
/// A missing value and `permanent` both yield [`PERMANENT`]. Strings outside
/// the grammar, and strings that add up to zero seconds, are rejected.
pub fn parse_duration(raw: Option<&str>) -> Result<i64, DurationError> {
    let Some(raw) = raw else {
        return Ok(PERMANENT);
    };

    let input = raw.trim();
    if input.eq_ignore_ascii_case("permanent") {
        return Ok(PERMANENT);
    }

    let invalid = || DurationError::Invalid(raw.to_owned());
    let captures = DURATION_PATTERN.captures(input).ok_or_else(invalid)?;

    let mut total = 0_i64;
    for (group, unit_seconds) in UNIT_GROUPS {
        let Some(number) = captures.get(group) else {
            continue;
        };

        let amount = number.as_str().parse::<i64>().map_err(|_| invalid())?;
        total = amount
            .checked_mul(unit_seconds)
            .and_then(|seconds| total.checked_add(seconds))
            .ok_or_else(invalid)?;
    }

    if total == 0 {
        return Err(invalid());
    }

    Ok(total)
}

/// Parse the duration field of a context-menu modal, where `revoke_keyword`
/// lifts the sanction instead of applying one.
pub fn parse_sanction_input(raw: &str, revoke_keyword: &str) -> Result<SanctionInput, DurationError> {
    if raw.trim().eq_ignore_ascii_case(revoke_keyword) {
        return Ok(SanctionInput::Revoke);
    }

    parse_duration(Some(raw)).map(SanctionInput::Apply)
}

/// Render seconds as `1 year, 2 days, 5 minutes`. [`PERMANENT`] renders as
/// `Permanent`.
pub fn format_duration(seconds: i64) -> String {
    if seconds == PERMANENT {
        return "Permanent".to_owned();
    }

    let units = [
        (SECONDS_PER_YEAR, "year"),
        (SECONDS_PER_MONTH, "month"),
        (SECONDS_PER_DAY, "day"),
        (SECONDS_PER_HOUR, "hour"),
        (SECONDS_PER_MINUTE, "minute"),
        (1, "second"),
    ];

    let mut remaining = seconds.max(0);
    let mut parts = Vec::new();
    for (unit_seconds, name) in units {
        let amount = remaining / unit_seconds;
        remaining %= unit_seconds;

        if amount > 0 {
            let plural = if amount > 1 { "s" } else { "" };
            parts.push(format!("{amount} {name}{plural}"));
        }
    }

    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::{
        DurationError, PERMANENT, SECONDS_PER_YEAR, SanctionInput, format_duration, parse_duration,
        parse_sanction_input,
    };

    #[test]
    fn parses_compact_units() {
        assert_eq!(parse_duration(Some("2d 3h")), Ok(2 * 86_400 + 3 * 3_600));
        assert_eq!(parse_duration(Some("10m")), Ok(600));
        assert_eq!(parse_duration(Some("1mo")), Ok(2_629_800));
        assert_eq!(parse_duration(Some("45s")), Ok(45));
        assert_eq!(parse_duration(Some("1h30m")), Ok(5_400));
    }

    #[test]
    fn parses_long_units_case_insensitively() {
        assert_eq!(parse_duration(Some("1 Year")), Ok(SECONDS_PER_YEAR));
        assert_eq!(parse_duration(Some("1y")), Ok(31_557_600));
        assert_eq!(
            parse_duration(Some("2 months, 1 day")),
            Ok(2 * 2_629_800 + 86_400)
        );
        assert_eq!(parse_duration(Some("  3 HOURS  ")), Ok(10_800));
    }

    #[test]
    fn missing_and_permanent_are_permanent() {
        assert_eq!(parse_duration(None), Ok(PERMANENT));
        assert_eq!(parse_duration(Some("permanent")), Ok(PERMANENT));
        assert_eq!(parse_duration(Some("PERMANENT")), Ok(PERMANENT));
    }

    #[test]
    fn rejects_strings_outside_the_grammar() {
        for raw in ["", "   ", "abc", "5 weeks", "3h 2d", "0s", "-5m", "1.5h"] {
            assert_eq!(
                parse_duration(Some(raw)),
                Err(DurationError::Invalid(raw.to_owned())),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_duration(Some("99999999999999999999y")).is_err());
        assert!(parse_duration(Some("9999999999999y")).is_err());
    }

    #[test]
    fn revoke_keyword_is_recognised() {
        assert_eq!(parse_sanction_input("Unban", "Unban"), Ok(SanctionInput::Revoke));
        assert_eq!(parse_sanction_input(" unmute ", "Unmute"), Ok(SanctionInput::Revoke));
        assert_eq!(
            parse_sanction_input("1d", "Unban"),
            Ok(SanctionInput::Apply(86_400))
        );
        assert_eq!(
            parse_sanction_input("permanent", "Unmute"),
            Ok(SanctionInput::Apply(PERMANENT))
        );
        assert!(parse_sanction_input("Unmute", "Unban").is_err());
    }

    #[test]
    fn formats_components_with_plurals() {
        assert_eq!(format_duration(PERMANENT), "Permanent");
        assert_eq!(format_duration(1), "1 second");
        assert_eq!(format_duration(86_400 + 2 * 3_600 + 60), "1 day, 2 hours, 1 minute");
        assert_eq!(format_duration(SECONDS_PER_YEAR + 5), "1 year, 5 seconds");
        assert_eq!(format_duration(2_629_800 * 2), "2 months");
    }

    #[test]
    fn formatted_durations_parse_back() {
        for seconds in [1, 59, 3_661, 86_400 * 3 + 7, 2_629_800 + 120, SECONDS_PER_YEAR * 2 + 86_400] {
            let formatted = format_duration(seconds);
            assert_eq!(parse_duration(Some(&formatted)), Ok(seconds), "{formatted}");
        }
    }
}
