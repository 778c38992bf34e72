//! Span-preserving syntax tree for Tapestry template (TML) files.
//!
//! TML is an XML dialect: ordinary XHTML markup with Tapestry components
//! addressed either through the `t:` namespace (`<t:grid .../>`) or through
//! `t:type`/`t:id` attributes on plain HTML tags. The annotator and the
//! navigation layer only need the tag tree with exact byte spans, so the
//! parser keeps every name and attribute-value location it sees and discards
//! character data.

pub mod parser;
pub mod tree;

pub use parser::{parse_template, TmlParseError};
pub use tree::{Span, TmlAttribute, TmlDocument, TmlTag};
