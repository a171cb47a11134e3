//! Reader for the surface syntax.
//!
//! Parses text into [`Form`]s: lists `( )`, vectors `[ ]`, maps `{ }`,
//! strings, numbers, keywords, symbols, `'sym` quote shorthand, `nil`,
//! `true`/`false`. Commas are whitespace; `;` starts a line comment.
//!
//! The reader exists so the compiler can be driven from plain text; the
//! compiler itself only ever sees [`Form`]s.

use crate::error::{TrellisError, TrellisResult};
use crate::form::Form;
use std::sync::Arc;

/// Read a single form from source text.
///
/// Trailing content after the form is an error.
pub fn read(src: &str) -> TrellisResult<Form> {
    let mut reader = Reader::new(src);
    let form = reader.read_form()?;
    reader.skip_ws();
    if !reader.at_eof() {
        return Err(reader.error("unexpected trailing content"));
    }
    Ok(form)
}

/// Read every form from source text.
pub fn read_many(src: &str) -> TrellisResult<Vec<Form>> {
    let mut reader = Reader::new(src);
    let mut forms = Vec::new();
    loop {
        reader.skip_ws();
        if reader.at_eof() {
            return Ok(forms);
        }
        forms.push(reader.read_form()?);
    }
}

/// Byte-cursor reader over source text.
struct Reader<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    #[inline]
    fn at_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    #[inline]
    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn error(&self, message: &str) -> TrellisError {
        TrellisError::ReadError {
            message: message.to_string(),
            pos: self.pos,
        }
    }

    /// Skip whitespace (commas included) and line comments.
    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' | b',' => {
                    self.pos += 1;
                }
                b';' => {
                    while let Some(b) = self.peek() {
                        self.pos += 1;
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_form(&mut self) -> TrellisResult<Form> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'(') => self.read_seq(b')').map(Form::List),
            Some(b'[') => self.read_seq(b']').map(Form::Vector),
            Some(b'{') => self.read_map(),
            Some(b')') | Some(b']') | Some(b'}') => Err(self.error("unmatched closing delimiter")),
            Some(b'"') => self.read_string(),
            Some(b'\'') => {
                self.pos += 1;
                let inner = self.read_form()?;
                Ok(Form::List(vec![Form::sym("quote"), inner]))
            }
            Some(b':') => self.read_keyword(),
            Some(_) => self.read_atom(),
        }
    }

    fn read_seq(&mut self, close: u8) -> TrellisResult<Vec<Form>> {
        self.pos += 1; // opening delimiter
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(self.error("unterminated collection")),
                Some(b) if b == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.read_form()?),
            }
        }
    }

    fn read_map(&mut self) -> TrellisResult<Form> {
        let items = self.read_seq(b'}')?;
        if items.len() % 2 != 0 {
            return Err(self.error("map literal requires an even number of forms"));
        }
        let mut pairs = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
            pairs.push((k, v));
        }
        Ok(Form::Map(pairs))
    }

    fn read_string(&mut self) -> TrellisResult<Form> {
        self.pos += 1; // opening quote
        let mut out = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(b'"') => {
                    let s = String::from_utf8_lossy(&out);
                    return Ok(Form::Str(Arc::from(s.as_ref())));
                }
                Some(b'\\') => match self.bump() {
                    Some(b'n') => out.push(b'\n'),
                    Some(b't') => out.push(b'\t'),
                    Some(b'"') => out.push(b'"'),
                    Some(b'\\') => out.push(b'\\'),
                    _ => return Err(self.error("invalid escape in string")),
                },
                Some(b) => out.push(b),
            }
        }
    }

    fn read_keyword(&mut self) -> TrellisResult<Form> {
        self.pos += 1; // colon
        let name = self.read_token();
        if name.is_empty() {
            return Err(self.error("empty keyword"));
        }
        Ok(Form::Keyword(Arc::from(name)))
    }

    fn read_atom(&mut self) -> TrellisResult<Form> {
        let token = self.read_token();
        if token.is_empty() {
            return Err(self.error("unexpected character"));
        }
        match token.as_str() {
            "nil" => return Ok(Form::Nil),
            "true" => return Ok(Form::Bool(true)),
            "false" => return Ok(Form::Bool(false)),
            _ => {}
        }
        let bytes = token.as_bytes();
        let numeric_start = bytes[0].is_ascii_digit()
            || (bytes[0] == b'-' && bytes.len() > 1 && bytes[1].is_ascii_digit());
        if numeric_start {
            if let Ok(n) = token.parse::<i64>() {
                return Ok(Form::Int(n));
            }
            if let Ok(x) = token.parse::<f64>() {
                return Ok(Form::Float(x));
            }
            return Err(self.error("malformed number"));
        }
        Ok(Form::Symbol(Arc::from(token.as_str())))
    }

    /// Consume a token up to the next delimiter.
    fn read_token(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' | b',' | b'(' | b')' | b'[' | b']' | b'{'
                | b'}' | b'"' | b';' | b'\'' => break,
                _ => self.pos += 1,
            }
        }
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }
}
