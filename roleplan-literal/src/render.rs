use serde_json::{Number, Value};

const INDENT: &str = "    ";

/// Layout knobs for [`render_assignment`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStyle {
    /// Emit a comma after the last item of every multi-line container.
    pub trailing_commas: bool,
    /// Containers nested at this depth or deeper stay on one line.
    pub inline_depth: Option<usize>,
    /// Multi-line containers at this depth never take a trailing comma.
    pub bare_depth: Option<usize>,
}

impl RenderStyle {
    pub const fn expanded() -> Self {
        Self {
            trailing_commas: false,
            inline_depth: None,
            bare_depth: None,
        }
    }

    pub const fn with_trailing_commas(mut self) -> Self {
        self.trailing_commas = true;
        self
    }

    pub const fn inline_from(mut self, depth: usize) -> Self {
        self.inline_depth = Some(depth);
        self
    }

    pub const fn without_trailing_comma_at(mut self, depth: usize) -> Self {
        self.bare_depth = Some(depth);
        self
    }

    fn trailing_comma_at(self, depth: usize) -> bool {
        self.trailing_commas && self.bare_depth != Some(depth)
    }

    fn is_inline(self, depth: usize) -> bool {
        self.inline_depth.is_some_and(|inline| depth >= inline)
    }
}

/// Renders `NAME = <literal>` for `value`. No trailing newline is added, so
/// the result can replace a located segment byte for byte.
pub fn render_assignment(name: &str, value: &Value, style: RenderStyle) -> String {
    let mut out = format!("{name} = ");
    write_value(&mut out, value, 0, style);
    out
}

pub fn render_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Shortest decimal form: integral values carry no fractional part and
/// nothing is written in exponent notation.
pub fn render_number(value: &Number) -> String {
    if let Some(int) = value.as_i64() {
        return int.to_string();
    }
    if let Some(uint) = value.as_u64() {
        return uint.to_string();
    }
    match value.as_f64() {
        Some(float) if float.is_finite() => format!("{float}"),
        _ => "0".to_string(),
    }
}

fn write_value(out: &mut String, value: &Value, depth: usize, style: RenderStyle) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(number) => out.push_str(&render_number(number)),
        Value::String(text) => out.push_str(&render_string(text)),
        Value::Array(items) => {
            write_container(out, ('[', ']'), items.len(), depth, style, |out, index| {
                write_value(out, &items[index], depth + 1, style);
            });
        }
        Value::Object(entries) => {
            let pairs = entries.iter().collect::<Vec<_>>();
            write_container(out, ('{', '}'), pairs.len(), depth, style, |out, index| {
                let (key, item) = pairs[index];
                out.push_str(&render_string(key));
                out.push_str(": ");
                write_value(out, item, depth + 1, style);
            });
        }
    }
}

fn write_container(
    out: &mut String,
    (open, close): (char, char),
    len: usize,
    depth: usize,
    style: RenderStyle,
    mut write_item: impl FnMut(&mut String, usize),
) {
    out.push(open);
    if len == 0 {
        out.push(close);
        return;
    }

    if style.is_inline(depth) {
        for index in 0..len {
            if index > 0 {
                out.push_str(", ");
            }
            write_item(out, index);
        }
        out.push(close);
        return;
    }

    out.push('\n');
    for index in 0..len {
        push_indent(out, depth + 1);
        write_item(out, index);
        if index + 1 < len || style.trailing_comma_at(depth) {
            out.push(',');
        }
        out.push('\n');
    }
    push_indent(out, depth);
    out.push(close);
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}
