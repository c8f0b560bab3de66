use serde_json::{Map, Number, Value};

use crate::scan::{is_ident_continue, is_ident_start};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Str(String),
    Number(Number),
    True,
    False,
    Null,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Colon,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    line: usize,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            message: message.into(),
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if ch == Some('\n') {
            self.line += 1;
        }
        ch
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '#' {
                while let Some(next) = self.peek() {
                    if next == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else if ch.is_whitespace() || ch == '\\' {
                // A trailing backslash is an explicit line continuation.
                self.advance();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments();
        let line = self.line;
        let Some(ch) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                line,
            });
        };

        let kind = match ch {
            '[' => self.punct(TokenKind::LBracket),
            ']' => self.punct(TokenKind::RBracket),
            '{' => self.punct(TokenKind::LBrace),
            '}' => self.punct(TokenKind::RBrace),
            '(' => self.punct(TokenKind::LParen),
            ')' => self.punct(TokenKind::RParen),
            ',' => self.punct(TokenKind::Comma),
            ':' => self.punct(TokenKind::Colon),
            '"' | '\'' => TokenKind::Str(self.lex_string(false)?),
            '+' | '-' | '.' | '0'..='9' => TokenKind::Number(self.lex_number()?),
            ch if is_ident_start(ch) => self.lex_word()?,
            other => return Err(self.error(format!("unexpected character '{other}'"))),
        };
        Ok(Token { kind, line })
    }

    fn punct(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn lex_word(&mut self) -> Result<TokenKind, ParseError> {
        let mut word = String::new();
        while let Some(ch) = self.peek() {
            if !is_ident_continue(ch) {
                break;
            }
            word.push(ch);
            self.advance();
        }
        match word.as_str() {
            "True" | "true" => Ok(TokenKind::True),
            "False" | "false" => Ok(TokenKind::False),
            "None" | "null" => Ok(TokenKind::Null),
            prefix if is_string_prefix(prefix) && matches!(self.peek(), Some('"' | '\'')) => {
                let raw = prefix.contains(['r', 'R']);
                Ok(TokenKind::Str(self.lex_string(raw)?))
            }
            other => Err(self.error(format!("unsupported name '{other}' in literal"))),
        }
    }

    fn lex_string(&mut self, raw: bool) -> Result<String, ParseError> {
        let Some(quote) = self.advance() else {
            return Err(self.error("expected string"));
        };
        let mut triple = false;
        if self.peek() == Some(quote) {
            self.advance();
            if self.peek() == Some(quote) {
                self.advance();
                triple = true;
            } else {
                return Ok(String::new());
            }
        }

        let start_line = self.line;
        let mut out = String::new();
        let mut closing_run = 0usize;
        loop {
            let Some(ch) = self.advance() else {
                return Err(ParseError {
                    line: start_line,
                    message: "unterminated string".to_string(),
                });
            };
            if ch == quote {
                if !triple {
                    return Ok(out);
                }
                closing_run += 1;
                if closing_run == 3 {
                    out.truncate(out.len() - 2);
                    return Ok(out);
                }
                out.push(ch);
                continue;
            }
            closing_run = 0;
            match ch {
                '\n' if !triple => {
                    return Err(ParseError {
                        line: start_line,
                        message: "unterminated string".to_string(),
                    });
                }
                '\\' if raw => {
                    out.push('\\');
                    if let Some(next) = self.advance() {
                        out.push(next);
                    }
                }
                '\\' => self.lex_escape(&mut out)?,
                other => out.push(other),
            }
        }
    }

    fn lex_escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let Some(ch) = self.advance() else {
            return Err(self.error("unterminated escape sequence"));
        };
        match ch {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' | '\'' | '"' => out.push(ch),
            '\n' => {}
            'x' => out.push(self.lex_code_point(2)?),
            'u' => out.push(self.lex_code_point(4)?),
            'U' => out.push(self.lex_code_point(8)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn lex_code_point(&mut self, digits: usize) -> Result<char, ParseError> {
        let mut value = 0u32;
        for _ in 0..digits {
            let digit = self
                .advance()
                .and_then(|ch| ch.to_digit(16))
                .ok_or_else(|| self.error("invalid hex escape"))?;
            value = value * 16 + digit;
        }
        char::from_u32(value).ok_or_else(|| self.error("escape is not a valid code point"))
    }

    fn lex_number(&mut self) -> Result<Number, ParseError> {
        let mut text = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            self.advance();
            if sign == '-' {
                text.push('-');
            }
            self.skip_whitespace_and_comments();
        }
        let mut is_float = false;
        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' => text.push(ch),
                '_' => {}
                '.' => {
                    is_float = true;
                    text.push(ch);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(ch);
                    self.advance();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        text.push(sign);
                    } else {
                        continue;
                    }
                }
                _ => break,
            }
            self.advance();
        }

        if !text.chars().any(|ch| ch.is_ascii_digit()) {
            return Err(self.error(format!("invalid number '{text}'")));
        }
        if !is_float && let Ok(value) = text.parse::<i64>() {
            return Ok(Number::from(value));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .ok_or_else(|| self.error(format!("invalid number '{text}'")))
    }
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "br" | "rb"
    )
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn bump(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ParseError> {
        if self.current.kind == kind {
            self.bump()?;
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError {
            line: self.current.line,
            message: format!("expected {expected}, found {}", describe(&self.current.kind)),
        }
    }

    fn parse_document(&mut self) -> Result<Value, ParseError> {
        let value = self.parse_value()?;
        if self.current.kind != TokenKind::Eof {
            return Err(self.unexpected("end of literal"));
        }
        Ok(value)
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        let token = self.bump()?;
        match token.kind {
            TokenKind::Str(first) => self.parse_concatenated(first),
            TokenKind::Number(number) => Ok(Value::Number(number)),
            TokenKind::True => Ok(Value::Bool(true)),
            TokenKind::False => Ok(Value::Bool(false)),
            TokenKind::Null => Ok(Value::Null),
            TokenKind::LBracket => self.parse_sequence(TokenKind::RBracket, "']'"),
            TokenKind::LParen => self.parse_sequence(TokenKind::RParen, "')'"),
            TokenKind::LBrace => self.parse_mapping(),
            other => Err(ParseError {
                line: token.line,
                message: format!("expected a value, found {}", describe(&other)),
            }),
        }
    }

    /// Adjacent string literals join into one, as they do in the source
    /// language.
    fn parse_concatenated(&mut self, mut text: String) -> Result<Value, ParseError> {
        while let TokenKind::Str(next) = &self.current.kind {
            text.push_str(next);
            self.bump()?;
        }
        Ok(Value::String(text))
    }

    fn parse_sequence(&mut self, close: TokenKind, what: &str) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.current.kind == close {
                self.bump()?;
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value()?);
            if self.current.kind == TokenKind::Comma {
                self.bump()?;
            } else {
                self.expect(close, &format!("',' or {what}"))?;
                return Ok(Value::Array(items));
            }
        }
    }

    fn parse_mapping(&mut self) -> Result<Value, ParseError> {
        let mut entries = Map::new();
        loop {
            if self.current.kind == TokenKind::RBrace {
                self.bump()?;
                return Ok(Value::Object(entries));
            }
            let line = self.current.line;
            let key = match self.parse_value()? {
                Value::String(key) => key,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => (if flag { "True" } else { "False" }).to_string(),
                Value::Null => "None".to_string(),
                _ => {
                    return Err(ParseError {
                        line,
                        message: "mapping keys must be scalar literals".to_string(),
                    });
                }
            };
            self.expect(TokenKind::Colon, "':' after mapping key")?;
            let value = self.parse_value()?;
            entries.insert(key, value);
            if self.current.kind == TokenKind::Comma {
                self.bump()?;
            } else {
                self.expect(TokenKind::RBrace, "',' or '}'")?;
                return Ok(Value::Object(entries));
            }
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Str(_) => "string".to_string(),
        TokenKind::Number(number) => format!("number {number}"),
        TokenKind::True => "True".to_string(),
        TokenKind::False => "False".to_string(),
        TokenKind::Null => "None".to_string(),
        TokenKind::LBracket => "'['".to_string(),
        TokenKind::RBracket => "']'".to_string(),
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Colon => "':'".to_string(),
        TokenKind::Eof => "end of input".to_string(),
    }
}

/// Parses one literal: lists, tuples, dicts, strings, numbers, booleans and
/// `None`. Trailing commas and `#` comments are accepted. Names, calls and
/// operators are rejected; nothing is ever evaluated.
pub fn parse_literal(source: &str) -> Result<Value, ParseError> {
    Parser::new(source)?.parse_document()
}
