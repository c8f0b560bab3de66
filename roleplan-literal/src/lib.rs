pub mod extract;
pub mod locate;
pub mod parser;
pub mod render;
mod scan;

pub use extract::{
    ExtractError, extract_located, extract_segment, normalize_keywords, read_assignment,
    strip_comments,
};
pub use locate::{Bracket, LocateError, Segment, locate};
pub use parser::{ParseError, parse_literal};
pub use render::{RenderStyle, render_assignment, render_number, render_string};
