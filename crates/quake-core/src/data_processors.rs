use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

// ── NumberCoercer ─────────────────────────────────────────────────────────────

/// Turns loosely formatted numeric fields (`"10,5"`, `" 4.7 "`, `"12 km"`)
/// into `f64`.
pub struct NumberCoercer;

impl NumberCoercer {
    /// Parse `raw`, returning `None` only when a non-blank value cannot be
    /// read as a finite number.
    ///
    /// Blank input is `Some(0.0)`: an empty cell is missing data, not bad data.
    pub fn parse(raw: &str) -> Option<f64> {
        if raw.trim().is_empty() {
            return Some(0.0);
        }
        let cleaned = Self::clean(raw);
        cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Like [`parse`](Self::parse) but falls back to `0.0`.
    pub fn coerce(raw: &str) -> f64 {
        match Self::parse(raw) {
            Some(v) => v,
            None => {
                debug!(
                    "NumberCoercer: could not convert \"{}\" (cleaned \"{}\"), using 0.0",
                    raw,
                    Self::clean(raw)
                );
                0.0
            }
        }
    }

    /// Decimal comma becomes a point; everything except digits, `.` and `-`
    /// is dropped (whitespace, quotes, units).
    pub fn clean(raw: &str) -> String {
        raw.trim()
            .replace(',', ".")
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect()
    }
}

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Date-time patterns, tried in order. First match wins.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Date-only patterns; the result is midnight of that day.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y", "%m/%d/%Y"];

static RE_TRAILING_OFFSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)\s*(?:Z|[+-]\d{2}:?\d{2})$")
        .expect("regex is valid")
});

static RE_DATE_T_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)\s*T\s*(\d)").expect("regex is valid"));

static RE_COLON_SPACING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*:\s*").expect("regex is valid"));

/// `Fri Dec 15 14:30:00 UTC 2023`: weekday and zone are discarded.
static RE_FREE_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{3} ([A-Za-z]{3}) (\d{1,2}) (\d{1,2}:\d{2}:\d{2}) [A-Za-z]{2,5} (\d{4})$")
        .expect("regex is valid")
});

static RE_RELAXED_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})[T ](\d{1,2}):(\d{1,2}):(\d{1,2})")
        .expect("regex is valid")
});

static RE_RELAXED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})").expect("regex is valid"));

/// Parses the mix of timestamp spellings found in upstream event feeds.
///
/// Time zones are not retained: an offset or zone name is removed and the
/// wall-clock time is kept as a [`NaiveDateTime`].
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Parse `raw` into a timestamp, or `None` when nothing matches.
    ///
    /// Order: pattern catalog, free-form `Fri Dec 15 ...` style, then relaxed
    /// digit-group extraction of a date-time and finally of a bare date.
    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        if raw.trim().is_empty() {
            return None;
        }

        let cleaned = Self::clean(raw);

        for fmt in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
                return Some(dt);
            }
        }
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
                return date.and_hms_opt(0, 0, 0);
            }
        }
        if let Some(dt) = Self::parse_free_form(&cleaned) {
            return Some(dt);
        }
        // A date-time shape with impossible values is absent, not midnight.
        let relaxed = match RE_RELAXED_DATETIME.captures(&cleaned) {
            Some(caps) => Self::extract_datetime(&caps),
            None => Self::extract_date(&cleaned),
        };
        if relaxed.is_some() {
            return relaxed;
        }

        debug!(
            "TimestampProcessor: could not parse timestamp \"{}\" (cleaned \"{}\")",
            raw, cleaned
        );
        None
    }

    /// Normalise spacing and quoting and drop a trailing UTC offset.
    pub fn clean(raw: &str) -> String {
        let unquoted: String = raw.chars().filter(|c| *c != '"' && *c != '\'').collect();
        let collapsed = unquoted.split_whitespace().collect::<Vec<_>>().join(" ");
        let tightened = RE_DATE_T_TIME.replace_all(&collapsed, "${1}T${2}");
        let tightened = RE_COLON_SPACING.replace_all(&tightened, ":");

        match RE_TRAILING_OFFSET.captures(&tightened) {
            Some(caps) => caps[1].to_string(),
            None => tightened.into_owned(),
        }
    }

    fn parse_free_form(cleaned: &str) -> Option<NaiveDateTime> {
        let caps = RE_FREE_FORM.captures(cleaned)?;
        let rebuilt = format!("{} {} {} {}", &caps[1], &caps[2], &caps[4], &caps[3]);
        NaiveDateTime::parse_from_str(&rebuilt, "%b %d %Y %H:%M:%S").ok()
    }

    fn extract_datetime(caps: &Captures<'_>) -> Option<NaiveDateTime> {
        let year: i32 = caps[1].parse().ok()?;
        let nums: Vec<u32> = (2..=6)
            .map(|i| caps[i].parse::<u32>())
            .collect::<Result<_, _>>()
            .ok()?;
        NaiveDate::from_ymd_opt(year, nums[0], nums[1])?.and_hms_opt(nums[2], nums[3], nums[4])
    }

    fn extract_date(cleaned: &str) -> Option<NaiveDateTime> {
        let caps = RE_RELAXED_DATE.captures(cleaned)?;
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
    }
}

// ── RegionNormalizer ──────────────────────────────────────────────────────────

/// Maximum characters kept from a normalized region before the `...` marker.
pub const REGION_MAX_CHARS: usize = 25;

/// Reduces free-text region labels to a stable grouping key.
pub struct RegionNormalizer;

impl RegionNormalizer {
    /// First comma component, trimmed, title-cased per word and truncated to
    /// [`REGION_MAX_CHARS`] characters plus `...`.
    ///
    /// `"NORTH carolina, USA"` → `"North Carolina"`. Returns an empty string
    /// for a blank label.
    pub fn normalize(raw: &str) -> String {
        let first = raw.split(',').next().unwrap_or_default();
        let titled = first
            .split_whitespace()
            .map(Self::title_case_word)
            .collect::<Vec<_>>()
            .join(" ");

        if titled.chars().count() > REGION_MAX_CHARS {
            let kept: String = titled.chars().take(REGION_MAX_CHARS).collect();
            format!("{kept}...")
        } else {
            titled
        }
    }

    fn title_case_word(word: &str) -> String {
        let lower = word.to_lowercase();
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    // ── NumberCoercer ────────────────────────────────────────────────────────

    #[test]
    fn test_number_decimal_comma() {
        assert_eq!(NumberCoercer::coerce("10,5"), 10.5);
        assert_eq!(NumberCoercer::coerce("15,3"), 15.3);
    }

    #[test]
    fn test_number_blank_is_zero_without_fallback() {
        assert_eq!(NumberCoercer::parse("  "), Some(0.0));
        assert_eq!(NumberCoercer::parse(""), Some(0.0));
        assert_eq!(NumberCoercer::coerce("  "), 0.0);
    }

    #[test]
    fn test_number_garbage_falls_back() {
        assert_eq!(NumberCoercer::parse("abc"), None);
        assert_eq!(NumberCoercer::coerce("abc"), 0.0);
    }

    #[test]
    fn test_number_negative() {
        assert_eq!(NumberCoercer::coerce("-3.2"), -3.2);
    }

    #[test]
    fn test_number_strips_noise() {
        assert_eq!(NumberCoercer::coerce("\" 4.7 \""), 4.7);
        assert_eq!(NumberCoercer::coerce("12 500 m"), 12500.0);
        assert_eq!(NumberCoercer::coerce("10.5"), 10.5);
    }

    #[test]
    fn test_number_thousands_separator_is_not_supported() {
        // "1,234.5" → "1.234.5" which is not a number.
        assert_eq!(NumberCoercer::parse("1,234.5"), None);
    }

    #[test]
    fn test_number_overflow_is_fallback() {
        let huge = "9".repeat(400);
        assert_eq!(NumberCoercer::parse(&huge), None);
    }

    #[test]
    fn test_number_clean() {
        assert_eq!(NumberCoercer::clean(" 1,5 km "), "1.5");
    }

    // ── TimestampProcessor ───────────────────────────────────────────────────

    #[test]
    fn test_parse_iso_t_separator() {
        assert_eq!(
            TimestampProcessor::parse("2023-12-15T14:30:00"),
            Some(dt(2023, 12, 15, 14, 30, 0))
        );
    }

    #[test]
    fn test_parse_iso_fractional_seconds() {
        let t = TimestampProcessor::parse("2023-12-15T14:30:00.123456").unwrap();
        assert_eq!(t.second(), 0);
        assert_eq!(t.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        assert_eq!(
            TimestampProcessor::parse("2023-12-15"),
            Some(dt(2023, 12, 15, 0, 0, 0))
        );
    }

    #[test]
    fn test_parse_blank_is_absent() {
        assert_eq!(TimestampProcessor::parse(""), None);
        assert_eq!(TimestampProcessor::parse("   "), None);
    }

    #[test]
    fn test_parse_slash_year_first() {
        assert_eq!(
            TimestampProcessor::parse("2023/12/15 08:15:00"),
            Some(dt(2023, 12, 15, 8, 15, 0))
        );
    }

    #[test]
    fn test_parse_day_first_before_month_first() {
        // Ambiguous: day-first wins.
        assert_eq!(
            TimestampProcessor::parse("05/04/2023 10:00:00"),
            Some(dt(2023, 4, 5, 10, 0, 0))
        );
        // Only month-first is valid here.
        assert_eq!(
            TimestampProcessor::parse("12/13/2023 10:00:00"),
            Some(dt(2023, 12, 13, 10, 0, 0))
        );
    }

    #[test]
    fn test_parse_dotted_day_first() {
        assert_eq!(
            TimestampProcessor::parse("15.12.2023 14:30:00"),
            Some(dt(2023, 12, 15, 14, 30, 0))
        );
        assert_eq!(
            TimestampProcessor::parse("15.12.2023"),
            Some(dt(2023, 12, 15, 0, 0, 0))
        );
    }

    #[test]
    fn test_parse_without_seconds() {
        assert_eq!(
            TimestampProcessor::parse("2023-12-15 14:30"),
            Some(dt(2023, 12, 15, 14, 30, 0))
        );
    }

    #[test]
    fn test_parse_strips_zulu_and_offsets() {
        let expected = Some(dt(2023, 12, 15, 14, 30, 0));
        assert_eq!(TimestampProcessor::parse("2023-12-15T14:30:00Z"), expected);
        assert_eq!(TimestampProcessor::parse("2023-12-15T14:30:00+05:30"), expected);
        assert_eq!(TimestampProcessor::parse("2023-12-15T14:30:00-0800"), expected);
        assert_eq!(TimestampProcessor::parse("2023-12-15 14:30:00 +0000"), expected);
    }

    #[test]
    fn test_parse_quoted_and_spaced() {
        assert_eq!(
            TimestampProcessor::parse("\"2023-12-15  T 14 : 30 : 00\""),
            Some(dt(2023, 12, 15, 14, 30, 0))
        );
        assert_eq!(
            TimestampProcessor::parse("'2023-12-15'"),
            Some(dt(2023, 12, 15, 0, 0, 0))
        );
    }

    #[test]
    fn test_parse_free_form_with_zone_name() {
        assert_eq!(
            TimestampProcessor::parse("Fri Dec 15 14:30:00 UTC 2023"),
            Some(dt(2023, 12, 15, 14, 30, 0))
        );
        assert_eq!(
            TimestampProcessor::parse("Mon Jan 1 00:05:09 EST 2024"),
            Some(dt(2024, 1, 1, 0, 5, 9))
        );
    }

    #[test]
    fn test_parse_relaxed_mixed_separators() {
        assert_eq!(
            TimestampProcessor::parse("2023-12/15 4:5:6"),
            Some(dt(2023, 12, 15, 4, 5, 6))
        );
        assert_eq!(
            TimestampProcessor::parse("event at 2023.1.2T03:04:05 local"),
            Some(dt(2023, 1, 2, 3, 4, 5))
        );
    }

    #[test]
    fn test_parse_relaxed_date_only() {
        let t = TimestampProcessor::parse("recorded 2021.7.4 (approx)").unwrap();
        assert_eq!((t.year(), t.month(), t.day(), t.hour()), (2021, 7, 4, 0));
    }

    #[test]
    fn test_parse_relaxed_invalid_time_is_absent() {
        assert_eq!(TimestampProcessor::parse("2023-12-15 25:00:00 x"), None);
        assert_eq!(TimestampProcessor::parse("2023-12-15T24:00:00"), None);
        assert_eq!(TimestampProcessor::parse("at 2023-02-30 10:00:00"), None);
    }

    #[test]
    fn test_parse_slash_dates_day_first_with_or_without_time() {
        assert_eq!(
            TimestampProcessor::parse("05/04/2023 10:00:00"),
            Some(dt(2023, 4, 5, 10, 0, 0))
        );
        assert_eq!(
            TimestampProcessor::parse("05/04/2023"),
            Some(dt(2023, 4, 5, 0, 0, 0))
        );
        assert_eq!(
            TimestampProcessor::parse("15/12/2023"),
            Some(dt(2023, 12, 15, 0, 0, 0))
        );
        // Month-first still applies when the first group cannot be a month.
        assert_eq!(
            TimestampProcessor::parse("12/15/2023"),
            Some(dt(2023, 12, 15, 0, 0, 0))
        );
    }

    #[test]
    fn test_parse_garbage_is_absent() {
        assert_eq!(TimestampProcessor::parse("not-a-timestamp"), None);
        assert_eq!(TimestampProcessor::parse("2023-13-45"), None);
    }

    #[test]
    fn test_clean_keeps_weekday_names() {
        assert_eq!(
            TimestampProcessor::clean("Thu Dec 14 01:02:03 GMT 2023"),
            "Thu Dec 14 01:02:03 GMT 2023"
        );
    }

    // ── RegionNormalizer ─────────────────────────────────────────────────────

    #[test]
    fn test_region_first_component_title_cased() {
        assert_eq!(RegionNormalizer::normalize("california"), "California");
        assert_eq!(RegionNormalizer::normalize("NEW YORK, USA"), "New York");
        assert_eq!(RegionNormalizer::normalize("  north   carolina "), "North Carolina");
        assert_eq!(RegionNormalizer::normalize("south-west"), "South-west");
    }

    #[test]
    fn test_region_blank() {
        assert_eq!(RegionNormalizer::normalize(""), "");
        assert_eq!(RegionNormalizer::normalize(" , USA"), "");
    }

    #[test]
    fn test_region_truncated_with_ellipsis() {
        let n = RegionNormalizer::normalize("south sandwich islands region, ocean");
        assert_eq!(n, "South Sandwich Islands Re...");
        assert_eq!(n.chars().count(), REGION_MAX_CHARS + 3);
    }

    #[test]
    fn test_region_exactly_max_not_truncated() {
        let raw = "a".repeat(REGION_MAX_CHARS);
        let n = RegionNormalizer::normalize(&raw);
        assert_eq!(n.chars().count(), REGION_MAX_CHARS);
        assert!(!n.ends_with("..."));
    }

    #[test]
    fn test_region_non_ascii() {
        assert_eq!(RegionNormalizer::normalize("КАМЧАТКА, Россия"), "Камчатка");
    }
}
