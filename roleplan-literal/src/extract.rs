use serde_json::Value;

use crate::locate::{Bracket, LocateError, Segment, locate};
use crate::parser::{ParseError, parse_literal};
use crate::scan::{is_ident_continue, is_ident_start, is_quote, skip_comment, skip_string};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    Locate(LocateError),
    Parse(ParseError),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Locate(err) => err.fmt(f),
            ExtractError::Parse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Locate(err) => Some(err),
            ExtractError::Parse(err) => Some(err),
        }
    }
}

impl From<LocateError> for ExtractError {
    fn from(err: LocateError) -> Self {
        ExtractError::Locate(err)
    }
}

impl From<ParseError> for ExtractError {
    fn from(err: ParseError) -> Self {
        ExtractError::Parse(err)
    }
}

/// Locates `name` in `source` and converts its literal into a value.
pub fn read_assignment(source: &str, name: &str, bracket: Bracket) -> Result<Value, ExtractError> {
    let segment = locate(source, name, bracket)?;
    Ok(extract_segment(segment.text(source))?)
}

/// Converts the text of one segment (`NAME = <literal>`) into a value.
///
/// The literal is first cleaned up into JSON (comments dropped, `True` /
/// `False` / `None` rewritten) and handed to `serde_json`. Anything JSON
/// cannot take, such as trailing commas or single quotes, goes through the
/// restricted literal parser instead, which reports the error if both fail.
pub fn extract_segment(segment_text: &str) -> Result<Value, ParseError> {
    let body = strip_assignment_prefix(segment_text);
    let cleaned = normalize_keywords(&strip_comments(body));
    if let Ok(value) = serde_json::from_str::<Value>(cleaned.trim()) {
        return Ok(value);
    }
    parse_literal(body)
}

/// Convenience for callers that already hold a located [`Segment`].
pub fn extract_located(source: &str, segment: &Segment) -> Result<Value, ParseError> {
    extract_segment(segment.text(source))
}

fn strip_assignment_prefix(text: &str) -> &str {
    let trimmed = text.trim_start();
    let Some(eq) = trimmed.find('=') else {
        return trimmed;
    };
    let (name, rest) = trimmed.split_at(eq);
    if !name.trim().is_empty() && name.trim().chars().all(is_ident_continue) {
        rest[1..].trim_start()
    } else {
        trimmed
    }
}

/// Truncates each line at its first `#` that is not inside a quoted string.
///
/// Quote tracking is per line; a quote preceded by a backslash neither opens
/// nor closes a string.
pub fn strip_comments(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.split('\n') {
        let mut in_string = false;
        let mut string_char = '\0';
        let mut prev = None;
        let mut cut = line.len();
        for (offset, ch) in line.char_indices() {
            if (ch == '"' || ch == '\'') && prev != Some('\\') {
                if !in_string {
                    in_string = true;
                    string_char = ch;
                } else if ch == string_char {
                    in_string = false;
                }
            }
            if ch == '#' && !in_string {
                cut = offset;
                break;
            }
            prev = Some(ch);
        }
        lines.push(&line[..cut]);
    }
    lines.join("\n")
}

/// Rewrites bare `True`, `False` and `None` into their JSON spellings. Quoted
/// strings and comments are left untouched.
pub fn normalize_keywords(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut index = 0;
    while index < bytes.len() {
        let byte = bytes[index];
        if is_quote(byte) {
            index = skip_string(bytes, index).unwrap_or(bytes.len());
            continue;
        }
        if byte == b'#' {
            index = skip_comment(bytes, index);
            continue;
        }
        if is_ident_start(byte as char) {
            let len = bytes[index..]
                .iter()
                .take_while(|byte| is_ident_continue(**byte as char))
                .count();
            let end = index + len;
            let replacement = match &text[index..end] {
                "True" => Some("true"),
                "False" => Some("false"),
                "None" => Some("null"),
                _ => None,
            };
            if let Some(replacement) = replacement {
                out.push_str(&text[copied..index]);
                out.push_str(replacement);
                copied = end;
            }
            index = end;
            continue;
        }
        index += 1;
    }
    out.push_str(&text[copied..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_removed_only_for_assignments() {
        assert_eq!(strip_assignment_prefix("NAME = [1]"), "[1]");
        assert_eq!(strip_assignment_prefix("  NAME=[1]"), "[1]");
        assert_eq!(strip_assignment_prefix("[\"a=b\"]"), "[\"a=b\"]");
    }

    #[test]
    fn keywords_inside_strings_survive_normalization() {
        let text = r#"{"None": True, "label": "True story"}"#;
        assert_eq!(
            normalize_keywords(text),
            r#"{"None": true, "label": "True story"}"#
        );
    }

    #[test]
    fn comment_markers_inside_quotes_are_kept() {
        let text = "{\"a#b\": 1,  # trailing\n \"c\": 'x#y'} # end";
        assert_eq!(strip_comments(text), "{\"a#b\": 1,  \n \"c\": 'x#y'} ");
    }
}
