//! Open-document state for the server: rope-backed text with LSP change
//! application and byte-offset ⇄ position conversion.
//!
//! Annotator spans are byte offsets into the template source; the LSP layer
//! converts them through the rope. Positions use character columns, which
//! matches ASCII-dominant template sources.

use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent};
use tracing::warn;
use url::Url;

use crate::tml::Span;

/// One open text document, keyed by URI in the backend.
#[derive(Debug)]
pub struct Document {
    pub uri: Url,
    pub text: Rope,
    pub version: i32,
}

impl Document {
    pub fn new(uri: Url, text: &str, version: i32) -> Self {
        Document {
            uri,
            text: Rope::from_str(text),
            version,
        }
    }

    /// Applies LSP content changes. Stale versions are dropped with a
    /// warning rather than rewinding history.
    pub fn apply(&mut self, changes: Vec<TextDocumentContentChangeEvent>, version: i32) {
        if version <= self.version {
            warn!(
                "dropping stale change for {} (version {} <= {})",
                self.uri, version, self.version
            );
            return;
        }
        for change in changes {
            match change.range {
                Some(range) => {
                    let start = self.position_to_char(range.start);
                    let end = self.position_to_char(range.end);
                    self.text.remove(start..end);
                    self.text.insert(start, &change.text);
                }
                None => {
                    self.text = Rope::from_str(&change.text);
                }
            }
        }
        self.version = version;
    }

    pub fn content(&self) -> String {
        self.text.to_string()
    }

    fn position_to_char(&self, position: Position) -> usize {
        let line = (position.line as usize).min(self.text.len_lines().saturating_sub(1));
        let line_start = self.text.line_to_char(line);
        let line_len = self.text.line(line).len_chars();
        line_start + (position.character as usize).min(line_len)
    }

    /// Converts a byte offset into an LSP position.
    pub fn offset_to_position(&self, byte_offset: usize) -> Position {
        let byte_offset = byte_offset.min(self.text.len_bytes());
        let char_idx = self.text.byte_to_char(byte_offset);
        let line = self.text.char_to_line(char_idx);
        let column = char_idx - self.text.line_to_char(line);
        Position {
            line: line as u32,
            character: column as u32,
        }
    }

    /// Converts an annotator byte span into an LSP range.
    pub fn span_to_range(&self, span: Span) -> Range {
        Range {
            start: self.offset_to_position(span.start),
            end: self.offset_to_position(span.end),
        }
    }
}
