//! Plain-text bar charts, share charts and tables.
//!
//! Every renderer returns the finished block as a `String`; callers decide
//! where it goes. Column padding is measured in display columns so wide
//! characters in region names keep the grid aligned.

use std::fmt::Write as _;

use quake_core::formatting::{format_depth_km, format_number};
use quake_core::models::EventRecord;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of the category column.
pub const LABEL_WIDTH: usize = 30;
/// Bar length for the largest value in a bar chart.
pub const MAX_BAR_LENGTH: usize = 50;
/// Width of the `=` / `-` rules under titles and headers.
pub const RULE_WIDTH: usize = 60;

const BAR_CHAR: char = '\u{2588}'; // █
const SHARE_CHAR: char = '\u{2022}'; // •

/// Horizontal bar chart. Bars are scaled so the largest value spans
/// [`MAX_BAR_LENGTH`] cells; negative values draw no bar.
pub fn render_bar_chart(
    title: &str,
    rows: &[(String, f64)],
    category_label: &str,
    value_label: &str,
) -> String {
    let mut out = title_block(title);
    let _ = writeln!(
        out,
        "{} | {} | Chart",
        pad(category_label, LABEL_WIDTH),
        pad(value_label, 20)
    );
    out.push_str(&rule('-'));

    let max = rows
        .iter()
        .map(|(_, v)| *v)
        .fold(f64::NEG_INFINITY, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };

    for (label, value) in rows {
        let length = ((value / max) * MAX_BAR_LENGTH as f64).max(0.0) as usize;
        let bar = BAR_CHAR.to_string().repeat(length);
        let _ = writeln!(
            out,
            "{} | {} | {}",
            pad(&truncate_to_width(label, LABEL_WIDTH), LABEL_WIDTH),
            pad(&format_number(*value, 2), 20),
            bar
        );
    }
    out
}

/// Share chart: value, percentage of the total and one `•` per 2 %
/// (at least one per row).
pub fn render_pie_chart(title: &str, rows: &[(String, f64)]) -> String {
    let mut out = title_block(title);
    let total: f64 = rows.iter().map(|(_, v)| v).sum();
    if total == 0.0 {
        out.push_str("No data to display\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{} | {} | {} | Share",
        pad("Category", LABEL_WIDTH),
        pad("Value", 10),
        pad("Percent", 10)
    );
    out.push_str(&rule('-'));

    for (label, value) in rows {
        let pct = value / total * 100.0;
        let dots = ((pct / 2.0) as usize).max(1);
        let share = SHARE_CHAR.to_string().repeat(dots);
        let _ = writeln!(
            out,
            "{} | {} | {} | {}",
            pad(&truncate_to_width(label, LABEL_WIDTH), LABEL_WIDTH),
            pad(&format_number(*value, 2), 10),
            pad(&format!("{pct:.1}%"), 10),
            share
        );
    }
    out
}

/// Two-column parameter/value table.
pub fn render_stats_table(title: &str, rows: &[(String, String)]) -> String {
    let mut out = title_block(title);
    let _ = writeln!(out, "{} | Value", pad("Parameter", 40));
    out.push_str(&rule('-'));
    for (key, value) in rows {
        let _ = writeln!(out, "{} | {}", pad(key, 40), value);
    }
    out
}

/// One row per event: id, region, magnitude (with type), depth and time.
pub fn render_event_table(title: &str, records: &[&EventRecord]) -> String {
    let headers = ["ID", "Region", "Magnitude", "Depth", "Time"];
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            let magnitude = if r.magnitude_type().is_empty() {
                format_number(r.magnitude(), 2)
            } else {
                format!("{} {}", format_number(r.magnitude(), 2), r.magnitude_type())
            };
            vec![
                r.id().to_string(),
                r.normalized_region(),
                magnitude,
                format_depth_km(r.depth()),
                r.time()
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    render_table(title, &headers, &rows)
}

/// Generic table with columns sized to their widest cell.
pub fn render_table(title: &str, headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.width().min(LABEL_WIDTH));
        }
    }

    let mut out = title_block(title);
    if rows.is_empty() {
        out.push_str("No data to display\n");
        return out;
    }

    let header_cells: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w))
        .collect();
    let _ = writeln!(out, "{}", header_cells.join(" | ").trim_end());
    out.push_str(&rule('-'));

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| pad(&truncate_to_width(cell, LABEL_WIDTH), *w))
            .collect();
        let _ = writeln!(out, "{}", cells.join(" | ").trim_end());
    }
    out
}

/// Cut `text` to at most `max_width` display columns, ending in `...` when
/// anything was removed.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let budget = max_width.saturating_sub(3);
    let mut used = 0;
    let mut kept = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        kept.push(c);
    }
    kept.push_str("...");
    kept
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Left-align `text` in `width` display columns.
fn pad(text: &str, width: usize) -> String {
    let w = text.width();
    if w >= width {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(width - w))
    }
}

fn rule(c: char) -> String {
    let mut line = c.to_string().repeat(RULE_WIDTH);
    line.push('\n');
    line
}

fn title_block(title: &str) -> String {
    format!("\n{}\n{}", title, rule('='))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
