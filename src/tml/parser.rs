//! Hand-written recursive-descent parser for TML markup.
//!
//! The parser accepts the XML subset Tapestry templates actually use: a
//! prolog, DOCTYPE, comments, CDATA sections, nested elements with quoted
//! attributes, and character data. It records byte spans for tag names,
//! closing tag names and attribute values, which is everything the annotator
//! needs; character data is validated but not retained.

use thiserror::Error;
use tracing::debug;

use super::tree::{Span, TmlAttribute, TmlDocument, TmlTag};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TmlParseError {
    #[error("unexpected end of template at byte {0}")]
    UnexpectedEof(usize),
    #[error("expected '{expected}' at byte {offset}")]
    Expected { expected: char, offset: usize },
    #[error("malformed tag name at byte {0}")]
    InvalidName(usize),
    #[error("mismatched closing tag: expected </{expected}> but found </{found}> at byte {offset}")]
    MismatchedClosingTag {
        expected: String,
        found: String,
        offset: usize,
    },
    #[error("unclosed element <{name}> starting at byte {offset}")]
    UnclosedElement { name: String, offset: usize },
    #[error("duplicate attribute '{name}' at byte {offset}")]
    DuplicateAttribute { name: String, offset: usize },
}

impl TmlParseError {
    /// Byte offset the error points at, for diagnostic positioning.
    pub fn offset(&self) -> usize {
        match self {
            TmlParseError::UnexpectedEof(offset)
            | TmlParseError::Expected { offset, .. }
            | TmlParseError::InvalidName(offset)
            | TmlParseError::MismatchedClosingTag { offset, .. }
            | TmlParseError::UnclosedElement { offset, .. }
            | TmlParseError::DuplicateAttribute { offset, .. } => *offset,
        }
    }
}

/// Parses a full template into its tag tree.
pub fn parse_template(source: &str) -> Result<TmlDocument, TmlParseError> {
    let mut parser = Parser {
        src: source,
        pos: 0,
    };
    let roots = parser.parse_top_level()?;
    debug!("parsed template: {} root element(s)", roots.len());
    Ok(TmlDocument { roots })
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_top_level(&mut self) -> Result<Vec<TmlTag>, TmlParseError> {
        let mut roots = Vec::new();
        loop {
            self.skip_misc();
            if self.at_eof() {
                return Ok(roots);
            }
            if !self.at_str("<") {
                // Stray top-level character data; XML forbids it but template
                // fragments in tests carry it, so it is skipped.
                self.pos += self.cur_char_len();
                continue;
            }
            if self.at_str("</") {
                let offset = self.pos;
                let (found, _) = self.parse_closing_tag()?;
                return Err(TmlParseError::MismatchedClosingTag {
                    expected: String::new(),
                    found,
                    offset,
                });
            }
            roots.push(self.parse_element()?);
        }
    }

    fn parse_element(&mut self) -> Result<TmlTag, TmlParseError> {
        let start = self.pos;
        self.expect('<')?;
        let (name, name_span) = self.parse_name()?;

        let mut attributes: Vec<TmlAttribute> = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_str("/>") {
                self.pos += 2;
                return Ok(TmlTag {
                    name,
                    name_span,
                    closing_name_span: None,
                    attributes,
                    children: Vec::new(),
                    self_closing: true,
                    span: Span::new(start, self.pos),
                });
            }
            if self.at_str(">") {
                self.pos += 1;
                break;
            }
            if self.at_eof() {
                return Err(TmlParseError::UnexpectedEof(self.pos));
            }
            let attr = self.parse_attribute()?;
            if attributes
                .iter()
                .any(|existing| existing.name.eq_ignore_ascii_case(&attr.name))
            {
                return Err(TmlParseError::DuplicateAttribute {
                    name: attr.name,
                    offset: attr.name_span.start,
                });
            }
            attributes.push(attr);
        }

        let children = self.parse_content(&name, start)?;
        let closing_offset = self.pos;
        let (closing_name, closing_name_span) = self.parse_closing_tag()?;
        if !closing_name.eq_ignore_ascii_case(&name) {
            return Err(TmlParseError::MismatchedClosingTag {
                expected: name,
                found: closing_name,
                offset: closing_offset,
            });
        }

        Ok(TmlTag {
            name,
            name_span,
            closing_name_span: Some(closing_name_span),
            attributes,
            children,
            self_closing: false,
            span: Span::new(start, self.pos),
        })
    }

    /// Parses element content up to (but not consuming) the matching closing
    /// tag.
    fn parse_content(
        &mut self,
        open_name: &str,
        open_offset: usize,
    ) -> Result<Vec<TmlTag>, TmlParseError> {
        let mut children = Vec::new();
        loop {
            if self.at_eof() {
                return Err(TmlParseError::UnclosedElement {
                    name: open_name.to_string(),
                    offset: open_offset,
                });
            }
            if self.at_str("</") {
                return Ok(children);
            }
            if self.at_str("<!--") {
                self.skip_comment()?;
            } else if self.at_str("<![CDATA[") {
                self.skip_until("]]>")?;
            } else if self.at_str("<?") {
                self.skip_until("?>")?;
            } else if self.at_str("<") {
                children.push(self.parse_element()?);
            } else {
                // Character data, dropped.
                self.pos += self.cur_char_len();
            }
        }
    }

    fn parse_closing_tag(&mut self) -> Result<(String, Span), TmlParseError> {
        self.expect('<')?;
        self.expect('/')?;
        let (name, span) = self.parse_name()?;
        self.skip_whitespace();
        self.expect('>')?;
        Ok((name, span))
    }

    fn parse_attribute(&mut self) -> Result<TmlAttribute, TmlParseError> {
        let (name, name_span) = self.parse_name()?;
        self.skip_whitespace();
        self.expect('=')?;
        self.skip_whitespace();
        let quote = match self.cur_byte() {
            Some(b @ (b'"' | b'\'')) => b as char,
            Some(_) => {
                return Err(TmlParseError::Expected {
                    expected: '"',
                    offset: self.pos,
                })
            }
            None => return Err(TmlParseError::UnexpectedEof(self.pos)),
        };
        self.pos += 1;
        let value_start = self.pos;
        while let Some(b) = self.cur_byte() {
            if b as char == quote {
                let value_span = Span::new(value_start, self.pos);
                let value = self.src[value_start..self.pos].to_string();
                self.pos += 1;
                return Ok(TmlAttribute {
                    name,
                    name_span,
                    value,
                    value_span,
                });
            }
            self.pos += self.cur_char_len();
        }
        Err(TmlParseError::UnexpectedEof(self.pos))
    }

    fn parse_name(&mut self) -> Result<(String, Span), TmlParseError> {
        let start = self.pos;
        while let Some(b) = self.cur_byte() {
            let c = b as char;
            if c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-' | '.') {
                self.pos += 1;
            } else if !b.is_ascii() {
                // Non-ASCII name characters pass through untouched.
                self.pos += self.cur_char_len();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(TmlParseError::InvalidName(start));
        }
        Ok((
            self.src[start..self.pos].to_string(),
            Span::new(start, self.pos),
        ))
    }

    /// Skips whitespace, comments, processing instructions and DOCTYPE
    /// declarations between top-level constructs.
    fn skip_misc(&mut self) {
        loop {
            self.skip_whitespace();
            if self.at_str("<!--") {
                if self.skip_comment().is_err() {
                    self.pos = self.src.len();
                    return;
                }
            } else if self.at_str("<?") {
                if self.skip_until("?>").is_err() {
                    self.pos = self.src.len();
                    return;
                }
            } else if self.at_str("<!DOCTYPE") || self.at_str("<!doctype") {
                if self.skip_until(">").is_err() {
                    self.pos = self.src.len();
                    return;
                }
            } else {
                return;
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), TmlParseError> {
        self.skip_until("-->")
    }

    fn skip_until(&mut self, terminator: &str) -> Result<(), TmlParseError> {
        match self.src[self.pos..].find(terminator) {
            Some(found) => {
                self.pos += found + terminator.len();
                Ok(())
            }
            None => Err(TmlParseError::UnexpectedEof(self.src.len())),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.cur_byte(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), TmlParseError> {
        match self.cur_byte() {
            Some(b) if b as char == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(TmlParseError::Expected {
                expected,
                offset: self.pos,
            }),
            None => Err(TmlParseError::UnexpectedEof(self.pos)),
        }
    }

    fn at_str(&self, needle: &str) -> bool {
        self.src[self.pos..].starts_with(needle)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn cur_byte(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn cur_char_len(&self) -> usize {
        self.src[self.pos..]
            .chars()
            .next()
            .map_or(1, |c| c.len_utf8())
    }
}
