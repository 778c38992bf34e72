//! Template annotation walker.
//!
//! One `annotate` call is a fresh depth-first pre-order traversal of a
//! template's tag tree. Recognized component tags produce cosmetic highlight
//! regions for their name tokens and bound-attribute names, error
//! diagnostics for non-soft references that resolve to nothing, and error
//! diagnostics for parameter bindings whose value type cannot coerce into
//! the declared parameter type. Unrecognized tags produce nothing themselves
//! but are still walked for their children.
//!
//! Evaluation failures inside value resolution are logged and suppressed;
//! cancellation always propagates.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, trace};

use super::coercion;
use super::java::{BindingPrefix, JavaType, ParameterDescriptor};
use super::project::{TapestryProjectModel, TAPESTRY_NAMESPACE_PREFIX};
use super::resolvers::{clean_value, ValueResolverChain};
use crate::tml::{Span, TmlAttribute, TmlDocument, TmlTag};

/// Cooperative cancellation signal, checked once per tag. Distinct from
/// evaluation failures: it is never caught inside the walk.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The walk was cancelled by the host; the partial annotation set must be
/// discarded.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("annotation walk cancelled")]
pub struct Cancelled;

/// Purely cosmetic region kinds, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    TagName,
    AttributeName,
}

/// One unit of annotator output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Error-severity diagnostic anchored at an exact text span.
    Diagnostic { span: Span, message: String },
    /// Advisory highlight region.
    Highlight { span: Span, kind: HighlightKind },
}

/// Receives annotations for the duration of one `annotate` call. The sink
/// must not be retained after the call returns.
pub trait AnnotationSink {
    fn accept(&mut self, annotation: Annotation);
}

impl AnnotationSink for Vec<Annotation> {
    fn accept(&mut self, annotation: Annotation) {
        self.push(annotation);
    }
}

/// Walker over one template file. Stateless between calls; every `annotate`
/// invocation is independent and restartable.
pub struct TemplateAnnotator<'a> {
    project: &'a TapestryProjectModel,
    template_path: &'a Path,
    cancel: CancelToken,
}

impl<'a> TemplateAnnotator<'a> {
    pub fn new(project: &'a TapestryProjectModel, template_path: &'a Path) -> Self {
        TemplateAnnotator {
            project,
            template_path,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Walks the document, writing annotations into `sink`. Deterministic:
    /// two walks over an unchanged tree produce the identical sequence.
    pub fn annotate(
        &self,
        document: &TmlDocument,
        sink: &mut dyn AnnotationSink,
    ) -> Result<(), Cancelled> {
        // The template's own element supplies the owner type for value
        // resolution; without it, coercion checking is skipped entirely.
        let owner_type = self
            .project
            .element_for_template(self.template_path)
            .and_then(|element| self.project.backing_type(element));

        for root in &document.roots {
            self.visit_tag(root, owner_type.as_ref(), sink)?;
        }
        Ok(())
    }

    fn visit_tag(
        &self,
        tag: &TmlTag,
        owner_type: Option<&JavaType>,
        sink: &mut dyn AnnotationSink,
    ) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            return Err(Cancelled);
        }

        if has_component_identifier(tag) {
            self.annotate_tag_names(tag, sink);

            if let Some(attr) = identifying_attribute(tag) {
                self.annotate_attribute_name(attr, sink);
                self.check_references(attr, identifying_references(self.project, attr), sink);
            }

            if let Some(component) = self.project.component_for_tag(tag) {
                trace!("tag <{}> resolved to component '{}'", tag.name, component.name);
                for parameter in self.project.parameters(component) {
                    let Some(attr) = tag.parameter_attribute(&parameter.name) else {
                        continue;
                    };
                    self.annotate_attribute_name(attr, sink);
                    self.check_references(
                        attr,
                        parameter_references(self.project, owner_type, parameter, attr),
                        sink,
                    );
                    if let Some(owner) = owner_type {
                        self.check_coercion(owner, parameter, attr, sink);
                    }
                }
            }
        }

        for child in &tag.children {
            self.visit_tag(child, owner_type, sink)?;
        }
        Ok(())
    }

    fn annotate_tag_names(&self, tag: &TmlTag, sink: &mut dyn AnnotationSink) {
        sink.accept(Annotation::Highlight {
            span: tag.name_span,
            kind: HighlightKind::TagName,
        });
        if let Some(closing) = tag.closing_name_span {
            sink.accept(Annotation::Highlight {
                span: closing,
                kind: HighlightKind::TagName,
            });
        }
    }

    fn annotate_attribute_name(&self, attr: &TmlAttribute, sink: &mut dyn AnnotationSink) {
        sink.accept(Annotation::Highlight {
            span: attr.name_span,
            kind: HighlightKind::AttributeName,
        });
    }

    /// Reference validation: every non-soft reference that resolves to
    /// nothing yields one error at its span shifted into the attribute
    /// value's absolute position.
    fn check_references(
        &self,
        attr: &TmlAttribute,
        references: Vec<ReferenceCheck>,
        sink: &mut dyn AnnotationSink,
    ) {
        for reference in references {
            if reference.soft || reference.resolved {
                continue;
            }
            sink.accept(Annotation::Diagnostic {
                span: reference.span_in_value.shifted(attr.value_span.start),
                message: format!("Cannot resolve symbol '{}'", reference.text),
            });
        }
    }

    /// Value coercion validation: evaluation failures are logged and
    /// suppressed, an unresolvable value is skipped silently, and a
    /// rejected coercion spans the whole attribute value.
    fn check_coercion(
        &self,
        owner: &JavaType,
        parameter: &ParameterDescriptor,
        attr: &TmlAttribute,
        sink: &mut dyn AnnotationSink,
    ) {
        let resolved = match ValueResolverChain::instance().resolve(
            self.project,
            owner,
            &attr.value,
            parameter.default_prefix,
        ) {
            Ok(Some(resolved)) => resolved,
            Ok(None) => return,
            Err(eval_error) => {
                error!(
                    "failed to evaluate binding '{}' for parameter '{}': {}",
                    attr.value, parameter.name, eval_error
                );
                return;
            }
        };

        let target = Some(&parameter.ty);
        if !coercion::can_coerce(self.project, &resolved.ty, clean_value(&attr.value), target) {
            sink.accept(Annotation::Diagnostic {
                span: attr.value_span,
                message: format!(
                    "Can't coerce a {} to a {}",
                    resolved.ty.name(),
                    target.map_or("undefined", |ty| ty.name())
                ),
            });
        }
    }
}

/// Whether the tag carries a component identifier: a `t:` namespace name or
/// a `t:type`/`t:id` attribute.
pub fn has_component_identifier(tag: &TmlTag) -> bool {
    tag.prefix() == Some(TAPESTRY_NAMESPACE_PREFIX)
        || identifying_attribute(tag).is_some()
}

/// The attribute naming which component applies, for plain-HTML component
/// tags. `t:type` wins over `t:id` when both are present.
pub fn identifying_attribute(tag: &TmlTag) -> Option<&TmlAttribute> {
    tag.attribute("t:type").or_else(|| tag.attribute("t:id"))
}

struct ReferenceCheck {
    text: String,
    span_in_value: Span,
    soft: bool,
    resolved: bool,
}

/// References inside an identifying attribute's value. `t:type` names a
/// component (non-soft); `t:id` names an embedded component id, which may
/// be declared in the class body and is therefore soft here.
fn identifying_references(
    project: &TapestryProjectModel,
    attr: &TmlAttribute,
) -> Vec<ReferenceCheck> {
    let (text, span) = trimmed_value(attr);
    if text.is_empty() {
        return Vec::new();
    }
    let soft = attr.local_name().eq_ignore_ascii_case("id");
    let resolved = !soft && project.component(&text).is_some();
    vec![ReferenceCheck {
        text,
        span_in_value: span,
        soft,
        resolved,
    }]
}

/// References inside a parameter binding, per the effective binding prefix.
/// `prop` paths yield one non-soft reference per segment; the `page`
/// parameter yields a non-soft page-name reference; literal, message and
/// asset bindings yield only soft references.
fn parameter_references(
    project: &TapestryProjectModel,
    owner_type: Option<&JavaType>,
    parameter: &ParameterDescriptor,
    attr: &TmlAttribute,
) -> Vec<ReferenceCheck> {
    let raw = attr.value.as_str();
    let (prefix, expression, offset) = effective_binding(raw, parameter.default_prefix);

    if parameter.name.eq_ignore_ascii_case("page") && prefix != BindingPrefix::Prop {
        let (text, span) = trimmed_subvalue(expression, offset);
        if text.is_empty() {
            return Vec::new();
        }
        let resolved = project.page(&text).is_some();
        return vec![ReferenceCheck {
            text,
            span_in_value: span,
            soft: false,
            resolved,
        }];
    }

    match prefix {
        BindingPrefix::Prop => {
            let Some(owner) = owner_type else {
                // Owner type undefined: cannot determine, no diagnostics.
                return Vec::new();
            };
            property_path_references(project, owner, expression, offset)
        }
        // Message keys, assets and literal text dangle silently.
        BindingPrefix::Literal | BindingPrefix::Message | BindingPrefix::Asset => Vec::new(),
    }
}

/// Splits an explicit known `prefix:` off the raw value, returning the
/// effective prefix, the remaining expression, and the expression's byte
/// offset inside the raw value.
fn effective_binding(raw: &str, default_prefix: BindingPrefix) -> (BindingPrefix, &str, usize) {
    if let Some((candidate, rest)) = raw.split_once(':') {
        if !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_lowercase()) {
            if let Some(prefix) = BindingPrefix::parse(candidate) {
                return (prefix, rest, candidate.len() + 1);
            }
        }
    }
    (default_prefix, raw, 0)
}

fn property_path_references(
    project: &TapestryProjectModel,
    owner: &JavaType,
    expression: &str,
    offset: usize,
) -> Vec<ReferenceCheck> {
    let trimmed = expression.trim();
    // Literals inside the prop grammar are not references.
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("true")
        || trimmed.eq_ignore_ascii_case("false")
        || trimmed == "this"
        || trimmed.starts_with('\'')
        || trimmed.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '-')
    {
        return Vec::new();
    }

    let mut references = Vec::new();
    let mut current = owner.clone();
    let mut segment_offset = offset;
    for segment in expression.split('.') {
        let leading = segment.len() - segment.trim_start().len();
        let text = segment.trim();
        let start = segment_offset + leading;
        let span = Span::new(start, start + text.len());
        segment_offset += segment.len() + 1;

        if text.is_empty() {
            break;
        }
        match project.property_of(&current, text) {
            Some(property) => {
                references.push(ReferenceCheck {
                    text: text.to_string(),
                    span_in_value: span,
                    soft: false,
                    resolved: true,
                });
                current = property.ty.clone();
            }
            None => {
                references.push(ReferenceCheck {
                    text: text.to_string(),
                    span_in_value: span,
                    soft: false,
                    resolved: false,
                });
                // Later segments have no known owner type to resolve
                // against.
                break;
            }
        }
    }
    references
}

fn trimmed_value(attr: &TmlAttribute) -> (String, Span) {
    trimmed_subvalue(&attr.value, 0)
}

fn trimmed_subvalue(text: &str, offset: usize) -> (String, Span) {
    let leading = text.len() - text.trim_start().len();
    let trimmed = text.trim();
    (
        trimmed.to_string(),
        Span::new(offset + leading, offset + leading + trimmed.len()),
    )
}
