//! Cascading forward body composition.
//!
//! A forwarded body carries at most one attribution block: when the source
//! is itself a forward, only the comment written above its attribution is
//! carried over, never the nested quote.

use super::{entity::Message, value_object::MAX_CONTENT_CHARS};

/// Prefix of the attribution header line.
pub const FORWARD_MARKER: &str = "↪ Forwarded from ";

pub fn is_marker_line(line: &str) -> bool {
    line.trim_start().starts_with(FORWARD_MARKER)
}

pub fn attribution_header(room_display_name: &str, author_display_name: &str) -> String {
    format!("{FORWARD_MARKER}{room_display_name} by {author_display_name}:")
}

/// Text of `source` that a forward of it should quote.
pub fn extract_forwardable(source: &Message) -> String {
    if source.is_forwarded() {
        let comment = source
            .content
            .lines()
            .take_while(|line| !is_marker_line(line))
            .collect::<Vec<_>>()
            .join("\n");
        let comment = comment.trim();
        if !comment.is_empty() {
            return comment.to_string();
        }
        return source
            .content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !is_marker_line(line))
            .unwrap_or_default()
            .to_string();
    }

    source
        .content
        .lines()
        .filter(|line| !is_marker_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// `[custom comment]` + attribution header + extracted content.
///
/// The quoted content is cut short with `…` so the whole body stays within
/// the message length limit.
pub fn compose_forward_body(
    custom_comment: Option<&str>,
    room_display_name: &str,
    author_display_name: &str,
    source: &Message,
) -> String {
    let mut body = String::new();
    if let Some(comment) = custom_comment.map(str::trim).filter(|c| !c.is_empty()) {
        // A comment must not smuggle in a second attribution block.
        let comment = comment
            .lines()
            .filter(|line| !is_marker_line(line))
            .collect::<Vec<_>>()
            .join("\n");
        if !comment.trim().is_empty() {
            body.push_str(comment.trim());
            body.push_str("\n\n");
        }
    }
    body.push_str(&attribution_header(room_display_name, author_display_name));
    let extracted = extract_forwardable(source);
    let budget = MAX_CONTENT_CHARS.saturating_sub(body.chars().count() + 1);
    if !extracted.is_empty() && budget > 0 {
        body.push('\n');
        body.push_str(&truncate_chars(&extracted, budget));
    }
    body
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
