//! Template annotation walker: diagnostics and highlight regions over parsed
//! TML documents.

mod common;

use tapestry_language_server::core::annotator::{
    Annotation, CancelToken, Cancelled, HighlightKind, TemplateAnnotator,
};
use tapestry_language_server::core::project::TapestryProjectModel;
use tapestry_language_server::tml::{parse_template, Span};

use common::{standard_project, FixtureProject};

fn annotate(model: &TapestryProjectModel, template_path: &std::path::Path, source: &str) -> Vec<Annotation> {
    let document = parse_template(source).expect("fixture template must parse");
    let mut annotations = Vec::new();
    TemplateAnnotator::new(model, template_path)
        .annotate(&document, &mut annotations)
        .expect("walk must not be cancelled");
    annotations
}

fn diagnostics(annotations: &[Annotation]) -> Vec<(&Span, &str)> {
    annotations
        .iter()
        .filter_map(|annotation| match annotation {
            Annotation::Diagnostic { span, message } => Some((span, message.as_str())),
            Annotation::Highlight { .. } => None,
        })
        .collect()
}

fn highlights(annotations: &[Annotation]) -> Vec<(&Span, HighlightKind)> {
    annotations
        .iter()
        .filter_map(|annotation| match annotation {
            Annotation::Highlight { span, kind } => Some((span, *kind)),
            Annotation::Diagnostic { .. } => None,
        })
        .collect()
}

fn span_of(source: &str, fragment: &str) -> Span {
    let start = source.find(fragment).expect("fragment must exist");
    Span::new(start, start + fragment.len())
}

#[test]
fn unrecognized_tags_produce_nothing_but_are_walked() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source = r#"<html><body><div class="x"><t:grid source="users"/></div></body></html>"#;
    let annotations = annotate(&model, &template, source);

    assert!(diagnostics(&annotations).is_empty());
    // Only the nested t:grid contributes highlight regions: its tag name and
    // its bound attribute name.
    let regions = highlights(&annotations);
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0], (&span_of(source, "t:grid"), HighlightKind::TagName));
    assert_eq!(
        regions[1],
        (&span_of(source, "source"), HighlightKind::AttributeName)
    );
}

#[test]
fn non_empty_tag_highlights_both_name_tokens() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source = "<t:grid source=\"users\">\n</t:grid>";
    let annotations = annotate(&model, &template, source);

    let regions = highlights(&annotations);
    let tag_names: Vec<&Span> = regions
        .iter()
        .filter(|(_, kind)| *kind == HighlightKind::TagName)
        .map(|(span, _)| *span)
        .collect();
    assert_eq!(tag_names.len(), 2);
    assert_eq!(*tag_names[0], Span::new(1, 7));
    assert_eq!(source[tag_names[1].start..tag_names[1].end].to_string(), "t:grid");
    assert!(tag_names[1].start > tag_names[0].end);
}

#[test]
fn unresolved_property_reference_is_reported_at_its_span() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source = r#"<html><t:grid source="missingProp"/></html>"#;
    let annotations = annotate(&model, &template, source);

    let found = diagnostics(&annotations);
    assert_eq!(found.len(), 1);
    let (span, message) = found[0];
    assert_eq!(message, "Cannot resolve symbol 'missingProp'");
    assert_eq!(*span, span_of(source, "missingProp"));
}

#[test]
fn resolved_property_path_produces_no_diagnostics() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source = r#"<html><t:grid source="users" row="user.name"/></html>"#;
    let annotations = annotate(&model, &template, source);
    assert!(diagnostics(&annotations).is_empty());
}

#[test]
fn failing_tail_segment_of_property_path_is_reported() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source = r#"<html><t:grid source="user.shoeSize"/></html>"#;
    let annotations = annotate(&model, &template, source);

    let found = diagnostics(&annotations);
    assert_eq!(found.len(), 1);
    let (span, message) = found[0];
    assert_eq!(message, "Cannot resolve symbol 'shoeSize'");
    assert_eq!(*span, span_of(source, "shoeSize"));
}

#[test]
fn uncoercible_literal_names_both_types() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source = r#"<html><t:grid source="users" inPlace="notabool"/></html>"#;
    let annotations = annotate(&model, &template, source);

    let found = diagnostics(&annotations);
    assert_eq!(found.len(), 1);
    let (span, message) = found[0];
    assert_eq!(message, "Can't coerce a String to a boolean");
    assert_eq!(*span, span_of(source, "notabool"));
}

#[test]
fn coercible_literals_are_silent() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source =
        r#"<html><t:grid source="users" inPlace="true" rowsPerPage="25"/></html>"#;
    let annotations = annotate(&model, &template, source);
    assert!(diagnostics(&annotations).is_empty());
}

#[test]
fn non_numeric_text_bound_to_int_parameter_is_reported() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source = r#"<html><t:grid source="users" rowsPerPage="lots"/></html>"#;
    let annotations = annotate(&model, &template, source);

    let found = diagnostics(&annotations);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1, "Can't coerce a String to a int");
}

#[test]
fn unknown_component_type_attribute_is_reported() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source = r#"<html><div t:type="carousel"></div></html>"#;
    let annotations = annotate(&model, &template, source);

    let found = diagnostics(&annotations);
    assert_eq!(found.len(), 1);
    let (span, message) = found[0];
    assert_eq!(message, "Cannot resolve symbol 'carousel'");
    assert_eq!(*span, span_of(source, "carousel"));
}

#[test]
fn component_id_attribute_dangles_silently() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source = r#"<html><div t:id="anythingAtAll"></div></html>"#;
    let annotations = annotate(&model, &template, source);
    assert!(diagnostics(&annotations).is_empty());
    // The tag is still recognized: name and attribute regions appear.
    assert!(!highlights(&annotations).is_empty());
}

#[test]
fn unresolved_page_name_is_reported() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source = r#"<html><t:pagelink page="somePage"/></html>"#;
    let annotations = annotate(&model, &template, source);

    let found = diagnostics(&annotations);
    assert_eq!(found.len(), 1);
    let (span, message) = found[0];
    assert_eq!(message, "Cannot resolve symbol 'somePage'");
    assert_eq!(*span, span_of(source, "somePage"));
}

#[test]
fn resolved_page_name_is_silent() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source = r#"<html><t:pagelink page="index"/></html>"#;
    let annotations = annotate(&model, &template, source);
    assert!(diagnostics(&annotations).is_empty());
}

#[test]
fn annotation_pass_is_idempotent() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let source =
        r#"<html><t:grid source="missingProp" inPlace="notabool"/><div t:type="carousel"/></html>"#;
    let document = parse_template(source).unwrap();
    let annotator = TemplateAnnotator::new(&model, &template);

    let mut first = Vec::new();
    annotator.annotate(&document, &mut first).unwrap();
    let mut second = Vec::new();
    annotator.annotate(&document, &mut second).unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn cancelled_walk_propagates_immediately() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    let document = parse_template(r#"<html><t:grid source="users"/></html>"#).unwrap();
    let token = CancelToken::new();
    token.cancel();

    let mut sink = Vec::new();
    let result = TemplateAnnotator::new(&model, &template)
        .with_cancel_token(token)
        .annotate(&document, &mut sink);
    assert_eq!(result, Err(Cancelled));
    assert!(sink.is_empty());
}

#[test]
fn template_without_backing_class_skips_coercion_checks() {
    let project = FixtureProject::new();
    project.write(
        "src/main/java/org/example/components/Grid.java",
        r#"package org.example.components;

import org.apache.tapestry5.BindingConstants;
import org.apache.tapestry5.annotations.Parameter;

public class Grid {

    @Parameter(defaultPrefix = BindingConstants.LITERAL)
    private boolean inPlace;
}
"#,
    );
    let orphan = project.write("src/main/webapp/Orphan.tml", "<html></html>\n");
    let model = project.model();

    // The attribute would fail coercion, but with no owning element for the
    // template there is no backing type to validate against.
    let source = r#"<html><t:grid inPlace="notabool"/></html>"#;
    let annotations = annotate(&model, &orphan, source);
    assert!(diagnostics(&annotations).is_empty());
}

#[test]
fn evaluation_failure_is_suppressed_and_walk_continues() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    // The empty prop expression on `source` fails evaluation; that failure
    // is logged, produces no diagnostic, and must not stop the later
    // coercion check on `inPlace`.
    let source = r#"<html><t:grid source="" inPlace="notabool"/></html>"#;
    let annotations = annotate(&model, &template, source);

    let found = diagnostics(&annotations);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1, "Can't coerce a String to a boolean");
}

#[test]
fn mixin_tags_do_not_resolve_as_components() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    // Confirm is a mixin; its tag carries the namespace prefix but resolves
    // to no component model, so its `message` parameter is never annotated.
    let source = r#"<html><t:confirm message="reallySure"/></html>"#;
    let annotations = annotate(&model, &template, source);

    assert!(diagnostics(&annotations).is_empty());
    let regions = highlights(&annotations);
    assert_eq!(regions.len(), 1);
    assert_eq!(
        regions[0],
        (&span_of(source, "t:confirm"), HighlightKind::TagName)
    );
}

#[test]
fn explicit_prefix_overrides_parameter_default() {
    let project = standard_project();
    let model = project.model();
    let template = project.path("src/main/java/org/example/pages/Index.tml");

    // rowsPerPage defaults to literal; an explicit prop: binding re-routes
    // evaluation and reference checking.
    let source = r#"<html><t:grid source="users" rowsPerPage="prop:count"/></html>"#;
    let annotations = annotate(&model, &template, source);
    assert!(diagnostics(&annotations).is_empty());

    let source = r#"<html><t:grid source="users" rowsPerPage="prop:nope"/></html>"#;
    let annotations = annotate(&model, &template, source);
    let found = diagnostics(&annotations);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1, "Cannot resolve symbol 'nope'");
}
