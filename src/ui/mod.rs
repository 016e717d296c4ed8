//! Terminal output for listings: status icons, listing cards, result
//! headers and a loading spinner.

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use std::time::Duration;

use crate::models::{Record, RecordKind, ResultPage};
use crate::utils::{
    format_number, format_price, format_relative_time, join_meta, truncate_with_ellipsis,
};

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
    }
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
        Status::Search => println!("{} {}", icon.yellow(), msg),
    }
}

/// Icon shown in front of each kind of listing.
pub fn kind_icon(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Book => "📘",
        RecordKind::Exchange => "🔄",
        RecordKind::Material => "📄",
    }
}

fn or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(fallback)
}

/// Body lines of a listing card, without colors.
///
/// The first line is the badge and headline; the last is the footer.
pub fn record_card(record: &Record, now: DateTime<Utc>) -> Vec<String> {
    let badge = format!("[{}]", record.kind().name());
    match record {
        Record::Book(book) => {
            let price = format_price(book.price);
            let condition = book
                .condition
                .as_ref()
                .map(|c| format!("{} Condition", c))
                .unwrap_or_default();
            vec![
                format!("{} {}", badge, or(book.title.as_deref(), "Untitled")),
                format!(
                    "📚 {}   🎓 {}   🏛️ {}",
                    or(book.subject.as_deref(), "General"),
                    or(book.class_label.as_deref(), "-"),
                    or(book.board.as_deref(), "-")
                ),
                join_meta(&[price.as_str(), condition.as_str()]),
                truncate_with_ellipsis(
                    or(book.description.as_deref(), "No description available"),
                    100,
                ),
                format!(
                    "👤 {}   📅 {}",
                    or(book.meta.user_name.as_deref(), "Unknown"),
                    format_relative_time(book.meta.created_at, now)
                ),
            ]
        }
        Record::Exchange(exchange) => vec![
            format!(
                "{} HAVE {} ⇄ NEED {}",
                badge,
                or(exchange.have_book.as_deref(), "?"),
                or(exchange.need_book.as_deref(), "?")
            ),
            format!(
                "HAVE {}   NEED {}",
                join_meta(&[
                    exchange.have_class.as_deref().unwrap_or_default(),
                    exchange.have_board.as_deref().unwrap_or_default(),
                ]),
                join_meta(&[
                    exchange.need_class.as_deref().unwrap_or_default(),
                    exchange.need_board.as_deref().unwrap_or_default(),
                ]),
            ),
            format!(
                "🔄 Seeking Exchange   📅 {}",
                format_relative_time(exchange.meta.created_at, now)
            ),
        ],
        Record::Material(material) => {
            let rating = material
                .rating
                .map(|r| format!("{:.1}", r))
                .unwrap_or_else(|| "N/A".to_string());
            vec![
                format!("{} {}", badge, or(material.title.as_deref(), "Untitled")),
                format!(
                    "📄 {}   🎓 {}   📚 {}",
                    or(material.doc_type.as_deref(), "-"),
                    or(material.class_label.as_deref(), "-"),
                    or(material.subject.as_deref(), "-")
                ),
                truncate_with_ellipsis(material.description.as_deref().unwrap_or_default(), 120),
                format!(
                    "📥 {} Downloads   ⭐ {}",
                    format_number(material.downloads.unwrap_or(0)),
                    rating
                ),
            ]
        }
    }
}

/// Print a listing card with a colored headline.
pub fn print_record_card(record: &Record, now: DateTime<Utc>) {
    let lines = record_card(record, now);
    let icon = kind_icon(record.kind());
    let last = lines.len().saturating_sub(1);

    println!();
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        if i == 0 {
            println!("{} {}", icon, line.blue().bold());
        } else if i == last {
            println!("   {}", line.dimmed());
        } else {
            println!("   {}", line);
        }
    }
}

/// Print the header above a page of results.
pub fn print_results_header(query: &str, page: &ResultPage, duration: Duration) {
    println!();
    if query.trim().is_empty() {
        println!(
            "{} Browsing available books",
            status_icon(Status::Search).yellow().bold()
        );
    } else {
        println!(
            "{} Search results for: \"{}\"",
            status_icon(Status::Search).yellow().bold(),
            query.cyan().bold()
        );
    }
    println!(
        "{} Found {} listings in {:.2}s",
        "─".repeat(30).dimmed(),
        format_number(page.total as u64).green().bold(),
        duration.as_secs_f64()
    );
}

/// Pagination footer, or `None` when everything fits on one page.
pub fn pagination_line(page: &ResultPage) -> Option<String> {
    if page.total_pages <= 1 && page.page <= 1 {
        return None;
    }
    let previous = if page.has_previous() { "‹ prev" } else { "      " };
    let next = if page.has_next() { "next ›" } else { "" };
    Some(format!(
        "{}   Page {} of {}   {}",
        previous, page.page, page.total_pages, next
    ))
}

/// Message shown when a search succeeds with nothing to show.
pub fn no_results_message(query: &str) -> String {
    if query.trim().is_empty() {
        "No listings match these filters.".to_string()
    } else {
        format!("No results for \"{}\". Try different keywords or filters.", query.trim())
    }
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "─".repeat(80).dimmed());
}

/// Loading spinner shown while a search is in flight.
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message.
    pub fn new(msg: &str) -> Self {
        let pb = indicatif::ProgressBar::new_spinner();
        if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// A spinner that draws nothing (non-terminal or quiet output)
    pub fn hidden() -> Self {
        Self {
            pb: indicatif::ProgressBar::hidden(),
        }
    }

    /// Finish and remove the spinner line.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }

    /// Finish with error message.
    pub fn finish_with_error(&self, msg: &str) {
        if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.red} {msg}") {
            self.pb.set_style(style.tick_chars("✗✗"));
        }
        self.pb.finish_with_message(msg.to_string());
    }
}
