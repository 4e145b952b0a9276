use chess::Square;
use std::str::FromStr;

use crate::models::Side;

/// Convert a side to its wire/display string
pub fn side_to_string(side: Side) -> String {
    match side {
        Side::White => "white".to_string(),
        Side::Black => "black".to_string(),
    }
}

/// Parse a square name such as `"e4"`, case-insensitively.
pub fn parse_square(name: &str) -> Option<Square> {
    Square::from_str(&name.trim().to_lowercase()).ok()
}

/// Render milliseconds as `m:ss`, flooring to whole seconds.
pub fn format_clock(ms: u64) -> String {
    format_queue_time(ms / 1000)
}

/// Render a seconds counter as `m:ss`.
pub fn format_queue_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
