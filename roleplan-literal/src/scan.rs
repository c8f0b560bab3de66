/// Steps over a quoted literal whose opening quote sits at `start`.
///
/// Handles `'`, `"` and their triple-quoted forms, honouring backslash
/// escapes. Returns the offset just past the closing quote, or `None` when the
/// literal never closes (single-quoted literals may not cross a newline).
pub(crate) fn skip_string(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let triple = bytes.get(start + 1) == Some(&quote) && bytes.get(start + 2) == Some(&quote);
    let mut index = if triple { start + 3 } else { start + 1 };
    while index < bytes.len() {
        let byte = bytes[index];
        if byte == b'\\' {
            index += 2;
            continue;
        }
        if byte == b'\n' && !triple {
            return None;
        }
        if byte == quote {
            if !triple {
                return Some(index + 1);
            }
            if bytes.get(index + 1) == Some(&quote) && bytes.get(index + 2) == Some(&quote) {
                return Some(index + 3);
            }
        }
        index += 1;
    }
    None
}

/// Offset of the newline ending the comment that starts at `start`, or the
/// end of input.
pub(crate) fn skip_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|byte| *byte == b'\n')
        .map(|offset| start + offset)
        .unwrap_or(bytes.len())
}

pub(crate) fn is_quote(byte: u8) -> bool {
    byte == b'"' || byte == b'\''
}

pub(crate) fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

pub(crate) fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
