use crate::scan::{is_quote, skip_comment, skip_string};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bracket {
    Square,
    Curly,
}

impl Bracket {
    pub fn open(self) -> char {
        match self {
            Bracket::Square => '[',
            Bracket::Curly => '{',
        }
    }

    pub fn close(self) -> char {
        match self {
            Bracket::Square => ']',
            Bracket::Curly => '}',
        }
    }

    /// The text that introduces an assignment, e.g. `APP_TIERS_DATA = [`.
    pub fn marker(self, name: &str) -> String {
        format!("{name} = {}", self.open())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    NotFound { marker: String },
    Unterminated { marker: String },
}

impl std::fmt::Display for LocateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocateError::NotFound { marker } => write!(f, "could not find '{marker}'"),
            LocateError::Unterminated { marker } => {
                write!(f, "could not find the end of '{marker}'")
            }
        }
    }
}

impl std::error::Error for LocateError {}

/// Byte range of one named assignment: from the first character of the name
/// up to and including its balanced closing bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub open: usize,
    pub end: usize,
}

impl Segment {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// The bracketed literal without the `NAME = ` prefix.
    pub fn body<'a>(&self, source: &'a str) -> &'a str {
        &source[self.open..self.end]
    }

    /// Returns `source` with this segment swapped for `replacement`; every
    /// byte outside the segment is preserved.
    pub fn replace(&self, source: &str, replacement: &str) -> String {
        let mut out =
            String::with_capacity(source.len() - (self.end - self.start) + replacement.len());
        out.push_str(&source[..self.start]);
        out.push_str(replacement);
        out.push_str(&source[self.end..]);
        out
    }
}

/// Finds the first `NAME = <open>` assignment in `source` and the bracket that
/// balances it.
///
/// Depth only tracks the requested bracket pair. Quoted literals and `#`
/// comments are stepped over whole, so brackets inside them never count.
pub fn locate(source: &str, name: &str, bracket: Bracket) -> Result<Segment, LocateError> {
    let marker = bracket.marker(name);
    let Some(start) = source.find(&marker) else {
        return Err(LocateError::NotFound { marker });
    };
    let open = start + marker.len() - 1;
    let bytes = source.as_bytes();
    let (open_byte, close_byte) = (bracket.open() as u8, bracket.close() as u8);

    let mut depth: i64 = 0;
    let mut index = open;
    while index < bytes.len() {
        let byte = bytes[index];
        if is_quote(byte) {
            match skip_string(bytes, index) {
                Some(next) => {
                    index = next;
                    continue;
                }
                None => return Err(LocateError::Unterminated { marker }),
            }
        }
        if byte == b'#' {
            index = skip_comment(bytes, index);
            continue;
        }
        if byte == open_byte {
            depth += 1;
        } else if byte == close_byte {
            depth -= 1;
            if depth == 0 {
                return Ok(Segment {
                    start,
                    open,
                    end: index + 1,
                });
            }
        }
        index += 1;
    }
    Err(LocateError::Unterminated { marker })
}
