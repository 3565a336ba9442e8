//! Pulls the structured weather record out of free-form model output.

use regex::Regex;
use std::sync::LazyLock;

use crate::model::WeatherSnapshot;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json[ \t]*\r?\n(.*?)\r?\n[ \t]*```").expect("fenced json pattern is valid")
});

/// Model text split into the prose to show and the structured record, if any.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedReply {
    pub display_text: String,
    pub snapshot: Option<WeatherSnapshot>,
}

/// Find and parse the embedded weather record.
///
/// A fenced `json` block wins over a bare object, and only the first candidate
/// is ever parsed. Anything that fails to parse is treated as absent.
pub fn extract(raw: &str) -> Option<WeatherSnapshot> {
    let (_, body) = locate(raw)?;
    parse_snapshot(body)
}

/// Extract the record and strip the matched block from the prose.
///
/// Every fenced `json` block is removed; when the record came from a bare
/// object, that object is removed too. Stripping does not depend on whether
/// parsing succeeded.
pub fn split_reply(raw: &str) -> ParsedReply {
    let Some((span, body)) = locate(raw) else {
        return ParsedReply { display_text: raw.trim().to_string(), snapshot: None };
    };

    let snapshot = parse_snapshot(body);

    let display_text = if FENCED_JSON.is_match(raw) {
        FENCED_JSON.replace_all(raw, "").trim().to_string()
    } else {
        join_around(&raw[..span.0], &raw[span.1..])
    };

    ParsedReply { display_text, snapshot }
}

/// Join the prose on either side of a removed object with a single separator:
/// a blank line if the gap held a line break, otherwise one space.
fn join_around(before: &str, after: &str) -> String {
    let head = before.trim();
    let tail = after.trim();
    if head.is_empty() || tail.is_empty() {
        return format!("{head}{tail}");
    }

    let gap_before = &before[before.trim_end().len()..];
    let gap_after = &after[..after.len() - after.trim_start().len()];
    let separator = if gap_before.contains('\n') || gap_after.contains('\n') { "\n\n" } else { " " };
    format!("{head}{separator}{tail}")
}

/// Byte span of the matched block and the JSON text inside it.
fn locate(raw: &str) -> Option<((usize, usize), &str)> {
    if let Some(caps) = FENCED_JSON.captures(raw) {
        let whole = caps.get(0)?;
        let body = caps.get(1)?;
        return Some(((whole.start(), whole.end()), body.as_str()));
    }

    let (start, end) = first_balanced_object(raw)?;
    Some(((start, end), &raw[start..end]))
}

fn parse_snapshot(body: &str) -> Option<WeatherSnapshot> {
    match serde_json::from_str::<WeatherSnapshot>(body.trim()) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            tracing::debug!(error = %err, "Embedded weather JSON did not parse; showing prose only");
            None
        }
    }
}

/// Span of the first `{ ... }` whose braces balance, ignoring braces inside
/// JSON string literals. Nested objects and arrays stay intact.
fn first_balanced_object(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }

            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((start, i + 1));
                    }
                }
                _ => {}
            }
        }

        // Unbalanced from here on; a later brace cannot close either.
        search_from = start + 1;
        if in_string {
            // A stray quote swallowed the rest; retry without trusting it.
            continue;
        }
        return None;
    }

    None
}
