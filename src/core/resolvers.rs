//! Value resolver chain: evaluates a bound attribute's expression text under
//! a binding prefix and reports the type of the value it would produce.
//!
//! The chain tries its variants in fixed priority order and the first one
//! claiming the effective prefix wins. Evaluation failures are ordinary
//! values of [`EvalError`], never panics; the annotator logs and suppresses
//! them. An unknown prefix claims nothing and the chain yields `Ok(None)`.

use once_cell::sync::Lazy;
use thiserror::Error;

use super::java::{BindingPrefix, JavaType, PrimitiveType};
use super::project::TapestryProjectModel;

/// Outcome of a successful evaluation: the type the bound value would have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    pub ty: JavaType,
}

impl ResolvedValue {
    fn of(ty: JavaType) -> Self {
        ResolvedValue { ty }
    }
}

/// Why an expression could not be evaluated. Distinct from cancellation,
/// which never travels through this channel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("empty binding expression")]
    EmptyExpression,
    #[error("malformed property expression '{0}'")]
    MalformedExpression(String),
}

/// Splits an explicit `prefix:` off the raw attribute text. Only a leading
/// run of lowercase letters before `:` counts as a prefix candidate, so
/// `http://...` under a literal binding stays literal text.
fn explicit_prefix(raw: &str) -> Option<(&str, &str)> {
    let (candidate, rest) = raw.split_once(':')?;
    if !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_lowercase()) {
        Some((candidate, rest))
    } else {
        None
    }
}

/// The raw attribute text with any binding-prefix decoration stripped and
/// whitespace trimmed; this is what coercion receives as context.
pub fn clean_value(raw: &str) -> &str {
    match explicit_prefix(raw) {
        Some((candidate, rest)) if BindingPrefix::parse(candidate).is_some() => rest.trim(),
        _ => raw.trim(),
    }
}

trait ValueResolver: Send + Sync {
    fn claims(&self, prefix: BindingPrefix) -> bool;

    fn resolve(
        &self,
        project: &TapestryProjectModel,
        owner: &JavaType,
        expression: &str,
    ) -> Result<Option<ResolvedValue>, EvalError>;
}

struct LiteralResolver;

impl ValueResolver for LiteralResolver {
    fn claims(&self, prefix: BindingPrefix) -> bool {
        prefix == BindingPrefix::Literal
    }

    fn resolve(
        &self,
        _project: &TapestryProjectModel,
        _owner: &JavaType,
        _expression: &str,
    ) -> Result<Option<ResolvedValue>, EvalError> {
        Ok(Some(ResolvedValue::of(JavaType::string())))
    }
}

struct PropResolver;

impl ValueResolver for PropResolver {
    fn claims(&self, prefix: BindingPrefix) -> bool {
        prefix == BindingPrefix::Prop
    }

    fn resolve(
        &self,
        project: &TapestryProjectModel,
        owner: &JavaType,
        expression: &str,
    ) -> Result<Option<ResolvedValue>, EvalError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(EvalError::EmptyExpression);
        }

        // Literals inside the prop grammar evaluate to their own type.
        if expression.eq_ignore_ascii_case("true") || expression.eq_ignore_ascii_case("false") {
            return Ok(Some(ResolvedValue::of(JavaType::Primitive(
                PrimitiveType::Boolean,
            ))));
        }
        if expression.len() >= 2 && expression.starts_with('\'') && expression.ends_with('\'') {
            return Ok(Some(ResolvedValue::of(JavaType::string())));
        }
        if expression == "this" {
            return Ok(Some(ResolvedValue::of(owner.clone())));
        }
        if let Some(numeric) = numeric_literal_type(expression) {
            return Ok(Some(ResolvedValue::of(JavaType::Primitive(numeric))));
        }

        // Otherwise a dotted property path against the owner type.
        let mut current = owner.clone();
        for segment in expression.split('.') {
            let segment = segment.trim();
            if !is_property_segment(segment) {
                return Err(EvalError::MalformedExpression(expression.to_string()));
            }
            match project.property_of(&current, segment) {
                Some(property) => current = property.ty.clone(),
                None => return Ok(None),
            }
        }
        Ok(Some(ResolvedValue::of(current)))
    }
}

struct MessageResolver;

impl ValueResolver for MessageResolver {
    fn claims(&self, prefix: BindingPrefix) -> bool {
        prefix == BindingPrefix::Message
    }

    fn resolve(
        &self,
        _project: &TapestryProjectModel,
        _owner: &JavaType,
        expression: &str,
    ) -> Result<Option<ResolvedValue>, EvalError> {
        if expression.trim().is_empty() {
            return Err(EvalError::EmptyExpression);
        }
        // Catalog contents are not modeled; a message always renders text.
        Ok(Some(ResolvedValue::of(JavaType::string())))
    }
}

struct AssetResolver;

impl ValueResolver for AssetResolver {
    fn claims(&self, prefix: BindingPrefix) -> bool {
        prefix == BindingPrefix::Asset
    }

    fn resolve(
        &self,
        _project: &TapestryProjectModel,
        _owner: &JavaType,
        expression: &str,
    ) -> Result<Option<ResolvedValue>, EvalError> {
        if expression.trim().is_empty() {
            return Err(EvalError::EmptyExpression);
        }
        Ok(Some(ResolvedValue::of(JavaType::Object(
            "org.apache.tapestry5.Asset".to_string(),
        ))))
    }
}

fn numeric_literal_type(expression: &str) -> Option<PrimitiveType> {
    let body = expression.strip_prefix('-').unwrap_or(expression);
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if body.contains('.') {
        body.parse::<f64>().ok().map(|_| PrimitiveType::Double)
    } else {
        body.parse::<i64>().ok().map(|_| PrimitiveType::Long)
    }
}

fn is_property_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Fixed-priority chain over the binding-prefix variants.
pub struct ValueResolverChain {
    resolvers: Vec<Box<dyn ValueResolver>>,
}

static CHAIN: Lazy<ValueResolverChain> = Lazy::new(ValueResolverChain::new);

impl ValueResolverChain {
    fn new() -> Self {
        ValueResolverChain {
            resolvers: vec![
                Box::new(LiteralResolver),
                Box::new(PropResolver),
                Box::new(MessageResolver),
                Box::new(AssetResolver),
            ],
        }
    }

    /// The shared chain instance.
    pub fn instance() -> &'static ValueResolverChain {
        &CHAIN
    }

    /// Evaluates `raw` under `default_prefix` (overridden by an explicit
    /// `prefix:` in the text). `Ok(None)` means no resolver claimed the
    /// prefix or the expression names nothing; `Err` means the expression
    /// itself is broken.
    pub fn resolve(
        &self,
        project: &TapestryProjectModel,
        owner: &JavaType,
        raw: &str,
        default_prefix: BindingPrefix,
    ) -> Result<Option<ResolvedValue>, EvalError> {
        let (prefix, expression) = match explicit_prefix(raw) {
            Some((candidate, rest)) => match BindingPrefix::parse(candidate) {
                Some(prefix) => (prefix, rest),
                // Unknown prefix: under a literal default the whole text is
                // literal, otherwise nothing claims it.
                None if default_prefix == BindingPrefix::Literal => {
                    (BindingPrefix::Literal, raw)
                }
                None => return Ok(None),
            },
            None => (default_prefix, raw),
        };
        for resolver in &self.resolvers {
            if resolver.claims(prefix) {
                return resolver.resolve(project, owner, expression);
            }
        }
        Ok(None)
    }
}
