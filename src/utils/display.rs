//! Terminal display helpers for listing output.
//!
//! Width handling is unicode-aware so titles in any script line up in
//! tables and cards.

use chrono::{DateTime, Utc};
use std::io::{self, IsTerminal};

/// Default width when terminal size cannot be determined.
pub const DEFAULT_WIDTH: usize = 100;

/// Get the current terminal width in characters.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Check if stdout is a terminal.
#[inline]
pub fn is_terminal() -> bool {
    io::stdout().is_terminal()
}

/// Display width of `text` in terminal columns.
pub fn display_width(text: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(text)
}

/// Truncate text to fit within `max_width` columns, appending `...` when cut.
///
/// # Examples
///
/// ```
/// use bookswap::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
/// assert_eq!(truncate_with_ellipsis("Hi", 8), "Hi");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    if display_width(text) <= max_width {
        return text.to_string();
    }

    let budget = max_width.saturating_sub(3);
    let mut width = 0;
    let mut truncated = String::new();
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(1);
        if width + w > budget {
            break;
        }
        width += w;
        truncated.push(c);
    }

    format!("{}...", truncated.trim_end())
}

/// Format a number with thousands separators.
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a listing price in rupees, or `N/A` when the listing has none.
///
/// Fractions are kept to two places and dropped when zero.
pub fn format_price(price: Option<f64>) -> String {
    let Some(price) = price.filter(|p| p.is_finite()) else {
        return "N/A".to_string();
    };

    let sign = if price < 0.0 { "-" } else { "" };
    let cents = (price.abs() * 100.0).round() as u64;
    let (whole, fraction) = (cents / 100, cents % 100);
    if fraction == 0 {
        format!("{}₨{}", sign, format_number(whole))
    } else {
        format!("{}₨{}.{:02}", sign, format_number(whole), fraction)
    }
}

/// Describe how long ago `at` was, relative to `now`.
///
/// Under an hour reads in minutes, under a day in hours, under a week in
/// days; anything older is shown as a date.
pub fn format_relative_time(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return "Unknown date".to_string();
    };

    let elapsed = now.signed_duration_since(at);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 60 {
        format!("{} min ago", minutes.max(0))
    } else if hours < 24 {
        format!("{} hours ago", hours)
    } else if days < 7 {
        format!("{} days ago", days)
    } else {
        at.format("%-m/%-d/%Y").to_string()
    }
}

/// Join non-empty parts with ` • `, the separator used on listing cards.
pub fn join_meta(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" • ")
}
