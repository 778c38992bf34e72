//! Tag-tree data model produced by the TML parser.

use std::fmt;

/// Half-open byte range into the template source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Shifts a span that is relative to some containing text (for example a
    /// reference range inside an attribute value) into absolute coordinates.
    pub fn shifted(&self, offset: usize) -> Span {
        Span::new(self.start + offset, self.end + offset)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A parsed template document. Well-formed XML has a single root, but the
/// parser tolerates fragments with several top-level elements.
#[derive(Debug, Clone)]
pub struct TmlDocument {
    pub roots: Vec<TmlTag>,
}

impl TmlDocument {
    /// Depth-first pre-order iteration over every tag in the document.
    pub fn walk(&self) -> impl Iterator<Item = &TmlTag> {
        let mut stack: Vec<&TmlTag> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            let tag = stack.pop()?;
            stack.extend(tag.children.iter().rev());
            Some(tag)
        })
    }
}

/// One element in the tag tree.
#[derive(Debug, Clone)]
pub struct TmlTag {
    /// Name exactly as written, including any namespace prefix.
    pub name: String,
    /// Span of the name token in the opening tag.
    pub name_span: Span,
    /// Span of the name token in the closing tag, absent for self-closing
    /// elements.
    pub closing_name_span: Option<Span>,
    pub attributes: Vec<TmlAttribute>,
    pub children: Vec<TmlTag>,
    pub self_closing: bool,
    /// Span of the whole element, from `<` to the final `>`.
    pub span: Span,
}

impl TmlTag {
    /// Namespace prefix, if the name is qualified.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Name with any namespace prefix removed.
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Whether the element has no body (`<t:grid/>`).
    pub fn is_empty_element(&self) -> bool {
        self.self_closing
    }

    /// Looks up an attribute by its full name, ASCII case-insensitively, the
    /// way XML attribute matching behaves for Tapestry templates.
    pub fn attribute(&self, name: &str) -> Option<&TmlAttribute> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Looks up an attribute by local name, accepting both the plain and the
    /// `t:`-prefixed spelling (`source` and `t:source` bind the same
    /// parameter).
    pub fn parameter_attribute(&self, local: &str) -> Option<&TmlAttribute> {
        self.attributes
            .iter()
            .find(|attr| attr.local_name().eq_ignore_ascii_case(local))
    }
}

/// One attribute of a tag. The value is kept exactly as written between the
/// quotes; `value_span` covers that raw text.
#[derive(Debug, Clone)]
pub struct TmlAttribute {
    pub name: String,
    pub name_span: Span,
    pub value: String,
    pub value_span: Span,
}

impl TmlAttribute {
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }
}
