//! Type coercion predicate: whether a resolved value's type can be coerced
//! into a parameter's declared type.
//!
//! Mirrors the framework's coercion pipeline closely enough for template
//! validation: identity, primitive ⇄ wrapper equivalence, numeric widening,
//! everything coerces to `String`, and string text coerces to a primitive
//! when the literal actually parses as one (which is why the cleaned
//! expression text travels along as context).

use super::java::{JavaType, PrimitiveType};
use super::project::TapestryProjectModel;

/// Pure predicate; no diagnostics, no side effects. An undefined target
/// rejects, so the caller still reports (naming the target "undefined").
pub fn can_coerce(
    project: &TapestryProjectModel,
    source: &JavaType,
    cleaned_text: &str,
    target: Option<&JavaType>,
) -> bool {
    let Some(target) = target else {
        return false;
    };

    if source == target {
        return true;
    }

    // Everything renders as text.
    if target.is_string() {
        return true;
    }

    // java.lang.Object accepts anything.
    if matches!(target, JavaType::Object(fqn) if fqn == "java.lang.Object") {
        return true;
    }

    match (source.unboxed(), target.unboxed()) {
        // Primitive/wrapper equivalence and numeric widening or narrowing;
        // the framework registers coercions both ways.
        (Some(from), Some(to)) => {
            from == to || (from.is_numeric() && to.is_numeric())
        }
        // String text coerces when the literal parses as the target.
        (None, Some(to)) if source.is_string() => string_parses_as(cleaned_text, to),
        _ => assignable(project, source, target),
    }
}

fn string_parses_as(text: &str, target: PrimitiveType) -> bool {
    let text = text.trim();
    match target {
        PrimitiveType::Boolean => {
            text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false")
        }
        PrimitiveType::Char => text.chars().count() == 1,
        PrimitiveType::Byte => text.parse::<i8>().is_ok(),
        PrimitiveType::Short => text.parse::<i16>().is_ok(),
        PrimitiveType::Int => text.parse::<i32>().is_ok(),
        PrimitiveType::Long => text.parse::<i64>().is_ok(),
        PrimitiveType::Float => text.parse::<f32>().is_ok(),
        PrimitiveType::Double => text.parse::<f64>().is_ok(),
    }
}

/// Reference-type assignability through the project's superclass chains.
/// Unknown classes are given the benefit of the doubt only for exact short
/// name matches; otherwise the coercion is rejected.
fn assignable(project: &TapestryProjectModel, source: &JavaType, target: &JavaType) -> bool {
    let (JavaType::Object(source_fqn), JavaType::Object(target_fqn)) = (source, target) else {
        return false;
    };
    if source.name() == target.name() {
        return true;
    }
    let mut current = Some(source_fqn.clone());
    let mut hops = 0;
    while let Some(fqn) = current {
        if &fqn == target_fqn {
            return true;
        }
        // Superclass chains in real projects are short; the bound guards
        // against accidental cycles in scanned facts.
        hops += 1;
        if hops > 32 {
            return false;
        }
        current = project
            .class_facts(&fqn)
            .and_then(|facts| facts.superclass.clone());
    }
    false
}
