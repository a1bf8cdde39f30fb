/// Render `value` with `decimals` fraction digits and `,` between
/// thousands groups.
///
/// ```
/// use quake_core::formatting::format_number;
///
/// assert_eq!(format_number(10500.0, 1), "10,500.0");
/// assert_eq!(format_number(4.7, 2), "4.70");
/// assert_eq!(format_number(-0.75, 2), "-0.75");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let scale = 10_f64.powi(decimals as i32);
    // Half-way cases such as 1.005 sit just below .5 in binary; nudge them up.
    let scaled = (value.abs() * scale * (1.0 + f64::EPSILON)).round();
    let fixed = format!("{:.*}", decimals as usize, scaled / scale);

    let (int_digits, fraction) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::new();
    if value < 0.0 && scaled != 0.0 {
        out.push('-');
    }
    out.push_str(&insert_separators(int_digits));
    if let Some(f) = fraction {
        out.push('.');
        out.push_str(f);
    }
    out
}

/// Format a depth given in metres as kilometres with one decimal.
///
/// ```
/// use quake_core::formatting::format_depth_km;
///
/// assert_eq!(format_depth_km(10500.0), "10.5 km");
/// assert_eq!(format_depth_km(0.0), "0.0 km");
/// ```
pub fn format_depth_km(metres: f64) -> String {
    format!("{} km", format_number(metres / 1000.0, 1))
}

/// Format an optional statistic, printing `n/a` when it is absent.
pub fn format_optional(value: Option<f64>, decimals: u32) -> String {
    match value {
        Some(v) => format_number(v, decimals),
        None => "n/a".to_string(),
    }
}

/// Share of `part` in `whole` as a percentage rounded to `decimal_places`.
/// A zero `whole` yields `0.0`.
///
/// ```
/// use quake_core::formatting::percentage;
///
/// assert_eq!(percentage(1.0, 4.0, 1), 25.0);
/// assert_eq!(percentage(3.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let scale = 10_f64.powi(decimal_places as i32);
    (part * 100.0 / whole * scale).round() / scale
}

/// Shorten `text` to at most `max_chars` characters, ending in `...` when cut.
///
/// ```
/// use quake_core::formatting::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Kamchatka", 30), "Kamchatka");
/// assert_eq!(truncate_with_ellipsis("Andreanof Islands", 10), "Andrean...");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let head: String = text.chars().take(keep).collect();
    format!("{head}...")
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn insert_separators(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
