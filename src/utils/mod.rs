//! Utility modules shared by the stores and the CLI.
//!
//! - [`HttpClient`]: shared reqwest client with configured timeouts
//! - [`truncate_with_ellipsis`], [`format_price`], [`format_relative_time`]:
//!   helpers for rendering listings in a terminal

mod display;
mod http;

pub use display::{
    display_width, format_number, format_price, format_relative_time, is_terminal, join_meta,
    terminal_width, truncate_with_ellipsis, DEFAULT_WIDTH,
};
pub use http::HttpClient;
