//! Lightweight model of the Java side of a Tapestry project.
//!
//! The project model does not embed a Java compiler. It extracts just the
//! facts component resolution needs from class sources: the public type, the
//! superclass, readable properties, and `@Parameter` declarations. The
//! scanner is line-oriented and intentionally shallow; generics are recorded
//! by their erasure and method bodies are ignored.

use std::fmt;

use tracing::trace;

/// A Java type as seen through component parameters and properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JavaType {
    Primitive(PrimitiveType),
    /// A reference type, carried by fully qualified name where one is known,
    /// simple name otherwise.
    Object(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
}

impl PrimitiveType {
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Char => "char",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "boolean" => PrimitiveType::Boolean,
            "byte" => PrimitiveType::Byte,
            "short" => PrimitiveType::Short,
            "int" => PrimitiveType::Int,
            "long" => PrimitiveType::Long,
            "float" => PrimitiveType::Float,
            "double" => PrimitiveType::Double,
            "char" => PrimitiveType::Char,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveType::Boolean | PrimitiveType::Char)
    }

    /// The `java.lang` wrapper class for this primitive.
    pub fn wrapper_fqn(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Byte => "java.lang.Byte",
            PrimitiveType::Short => "java.lang.Short",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
            PrimitiveType::Char => "java.lang.Character",
        }
    }
}

/// Simple names implicitly imported from `java.lang` that templates commonly
/// bind against.
const JAVA_LANG_TYPES: &[&str] = &[
    "Boolean", "Byte", "Short", "Integer", "Long", "Float", "Double", "Character", "String",
    "Object", "Number", "CharSequence", "Iterable", "Comparable",
];

impl JavaType {
    /// Interprets a type token from Java source: primitive keywords become
    /// primitives, known `java.lang` simple names are qualified, everything
    /// else is kept as written (array and generic decoration stripped).
    pub fn from_source(token: &str) -> JavaType {
        let base = token
            .split('<')
            .next()
            .unwrap_or(token)
            .trim_end_matches("[]")
            .trim();
        if let Some(primitive) = PrimitiveType::from_keyword(base) {
            return JavaType::Primitive(primitive);
        }
        if !base.contains('.') && JAVA_LANG_TYPES.contains(&base) {
            return JavaType::Object(format!("java.lang.{base}"));
        }
        JavaType::Object(base.to_string())
    }

    /// Short name used in diagnostics: primitive keyword or the last segment
    /// of the class name.
    pub fn name(&self) -> &str {
        match self {
            JavaType::Primitive(primitive) => primitive.keyword(),
            JavaType::Object(fqn) => fqn.rsplit('.').next().unwrap_or(fqn),
        }
    }

    pub fn fqn(&self) -> &str {
        match self {
            JavaType::Primitive(primitive) => primitive.keyword(),
            JavaType::Object(fqn) => fqn,
        }
    }

    pub fn string() -> JavaType {
        JavaType::Object("java.lang.String".to_string())
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JavaType::Object(fqn) if fqn == "java.lang.String" || fqn == "String")
    }

    /// Unboxes a wrapper type to its primitive, when it is one.
    pub fn unboxed(&self) -> Option<PrimitiveType> {
        match self {
            JavaType::Primitive(primitive) => Some(*primitive),
            JavaType::Object(fqn) => [
                PrimitiveType::Boolean,
                PrimitiveType::Byte,
                PrimitiveType::Short,
                PrimitiveType::Int,
                PrimitiveType::Long,
                PrimitiveType::Float,
                PrimitiveType::Double,
                PrimitiveType::Char,
            ]
            .into_iter()
            .find(|primitive| {
                let wrapper = primitive.wrapper_fqn();
                fqn == wrapper || Some(fqn.as_str()) == wrapper.rsplit('.').next()
            }),
        }
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fqn())
    }
}

/// Binding prefix selecting a value-resolver variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingPrefix {
    Literal,
    Prop,
    Message,
    Asset,
}

impl BindingPrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            BindingPrefix::Literal => "literal",
            BindingPrefix::Prop => "prop",
            BindingPrefix::Message => "message",
            BindingPrefix::Asset => "asset",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "literal" => BindingPrefix::Literal,
            "prop" => BindingPrefix::Prop,
            "message" => BindingPrefix::Message,
            "asset" => BindingPrefix::Asset,
            _ => return None,
        })
    }
}

/// One declared component parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub ty: JavaType,
    pub default_prefix: BindingPrefix,
    pub required: bool,
}

/// A readable property of a component class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaProperty {
    pub name: String,
    pub ty: JavaType,
}

/// Facts extracted from one Java source file.
#[derive(Debug, Clone)]
pub struct JavaClassFacts {
    pub fqn: String,
    pub package: String,
    pub name: String,
    pub superclass: Option<String>,
    pub is_public: bool,
    pub properties: Vec<JavaProperty>,
    /// `@Parameter` declarations in source order.
    pub parameters: Vec<ParameterDescriptor>,
}

impl JavaClassFacts {
    pub fn backing_type(&self) -> JavaType {
        JavaType::Object(self.fqn.clone())
    }

    pub fn property(&self, name: &str) -> Option<&JavaProperty> {
        self.properties
            .iter()
            .find(|property| property.name.eq_ignore_ascii_case(name))
    }
}

/// Scans a Java source file for the facts the project model needs.
///
/// Returns `None` when no class declaration is present (package-info files,
/// interfaces-only sources and the like).
pub fn scan_class_source(source: &str) -> Option<JavaClassFacts> {
    let source = strip_comments(source);

    let mut package = String::new();
    let mut name = None;
    let mut superclass = None;
    let mut is_public = false;
    let mut properties = Vec::new();
    let mut parameters = Vec::new();

    // Annotation arguments can span lines, so statements are accumulated
    // until a terminator rather than handled strictly per line.
    let mut pending_parameter: Option<ParameterAnnotation> = None;
    let mut pending_property = false;
    let mut buffer = String::new();

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if buffer.is_empty() && trimmed.starts_with('@') {
            if trimmed.starts_with("@Parameter") {
                if trimmed.contains('(') && !trimmed.contains(')') {
                    buffer.push_str(trimmed);
                    buffer.push(' ');
                    continue;
                }
                pending_parameter = Some(ParameterAnnotation::parse(trimmed));
            } else if trimmed.starts_with("@Property") {
                pending_property = true;
            }
            continue;
        }
        if !buffer.is_empty() {
            buffer.push_str(trimmed);
            buffer.push(' ');
            if !buffer.contains(')') {
                continue;
            }
            pending_parameter = Some(ParameterAnnotation::parse(&buffer));
            buffer.clear();
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("package ") {
            package = rest.trim_end_matches(';').trim().to_string();
            continue;
        }

        if name.is_none() {
            if let Some(declaration) = parse_class_declaration(trimmed) {
                is_public = declaration.is_public;
                superclass = declaration.superclass;
                name = Some(declaration.name);
                continue;
            }
        }

        if name.is_some() {
            if let Some(field) = parse_field(trimmed) {
                if let Some(annotation) = pending_parameter.take() {
                    parameters.push(ParameterDescriptor {
                        name: annotation
                            .name
                            .unwrap_or_else(|| parameter_name(&field.name)),
                        ty: field.ty.clone(),
                        default_prefix: annotation.default_prefix,
                        required: annotation.required,
                    });
                }
                // Every field doubles as a candidate property; Tapestry
                // exposes them through generated accessors.
                let property_name = parameter_name(&field.name);
                if pending_property || properties.iter().all(|p: &JavaProperty| p.name != property_name) {
                    properties.push(JavaProperty {
                        name: property_name,
                        ty: field.ty,
                    });
                }
                pending_property = false;
                continue;
            }
            if let Some(property) = parse_getter(trimmed) {
                if properties.iter().all(|p| p.name != property.name) {
                    properties.push(property);
                }
            }
            // Any other member resets annotation state.
            pending_parameter = None;
            pending_property = false;
        }
    }

    let name = name?;
    let fqn = if package.is_empty() {
        name.clone()
    } else {
        format!("{package}.{name}")
    };
    trace!(
        "scanned class {}: {} parameter(s), {} propert(ies)",
        fqn,
        parameters.len(),
        properties.len()
    );
    Some(JavaClassFacts {
        fqn,
        package,
        name,
        superclass,
        is_public,
        properties,
        parameters,
    })
}

struct ClassDeclaration {
    name: String,
    superclass: Option<String>,
    is_public: bool,
}

fn parse_class_declaration(line: &str) -> Option<ClassDeclaration> {
    let tokens: Vec<&str> = line
        .trim_end_matches('{')
        .split_whitespace()
        .collect();
    let class_index = tokens.iter().position(|token| *token == "class")?;
    let name = tokens.get(class_index + 1)?;
    let superclass = tokens
        .iter()
        .position(|token| *token == "extends")
        .and_then(|index| tokens.get(index + 1))
        .map(|token| token.split('<').next().unwrap_or(token).to_string());
    Some(ClassDeclaration {
        name: name.split('<').next().unwrap_or(name).to_string(),
        superclass,
        is_public: tokens[..class_index].contains(&"public"),
    })
}

struct Field {
    name: String,
    ty: JavaType,
}

fn parse_field(line: &str) -> Option<Field> {
    if !line.ends_with(';') || line.contains('(') {
        return None;
    }
    let declaration = line.trim_end_matches(';');
    // Initializers are irrelevant to the type.
    let declaration = declaration.split('=').next().unwrap_or(declaration).trim();
    let tokens: Vec<&str> = declaration.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }
    let name = tokens.last()?;
    if !is_java_identifier(name) {
        return None;
    }
    let ty_token = tokens.get(tokens.len() - 2)?;
    if matches!(
        *ty_token,
        "package" | "import" | "return" | "class" | "extends" | "implements"
    ) {
        return None;
    }
    Some(Field {
        name: (*name).to_string(),
        ty: JavaType::from_source(ty_token),
    })
}

/// Recognizes `public Type getFoo()` / `public boolean isFoo()` signatures
/// and derives the property they expose.
fn parse_getter(line: &str) -> Option<JavaProperty> {
    let open_paren = line.find('(')?;
    if !line[open_paren..].starts_with("()") {
        return None;
    }
    let signature: Vec<&str> = line[..open_paren].split_whitespace().collect();
    let method = signature.last()?;
    let ty_token = signature.get(signature.len().checked_sub(2)?)?;
    let stripped = method
        .strip_prefix("get")
        .or_else(|| method.strip_prefix("is"))?;
    let mut chars = stripped.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    let name = format!("{}{}", first.to_ascii_lowercase(), chars.as_str());
    Some(JavaProperty {
        name,
        ty: JavaType::from_source(ty_token),
    })
}

struct ParameterAnnotation {
    name: Option<String>,
    default_prefix: BindingPrefix,
    required: bool,
}

impl ParameterAnnotation {
    /// Parses `@Parameter(...)` arguments. Only `name`, `required` and
    /// `defaultPrefix` matter; `defaultPrefix` accepts both the
    /// `BindingConstants.X` form and a string literal.
    fn parse(text: &str) -> Self {
        let mut annotation = ParameterAnnotation {
            name: None,
            default_prefix: BindingPrefix::Prop,
            required: false,
        };
        let Some(open) = text.find('(') else {
            return annotation;
        };
        let Some(close) = text.rfind(')') else {
            return annotation;
        };
        for argument in text[open + 1..close].split(',') {
            let Some((key, value)) = argument.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            match key {
                "name" => annotation.name = Some(value.to_string()),
                "required" => annotation.required = value == "true",
                "defaultPrefix" => {
                    let constant = value
                        .strip_prefix("BindingConstants.")
                        .map(str::to_ascii_lowercase)
                        .unwrap_or_else(|| value.to_ascii_lowercase());
                    if let Some(prefix) = BindingPrefix::parse(&constant) {
                        annotation.default_prefix = prefix;
                    }
                }
                _ => {}
            }
        }
        annotation
    }
}

/// Tapestry strips `_` and `$` sigils when deriving parameter and property
/// names from fields.
fn parameter_name(field_name: &str) -> String {
    field_name.trim_start_matches(['_', '$']).to_string()
}

fn is_java_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    loop {
        let line_comment = rest.find("//");
        let block_comment = rest.find("/*");
        match (line_comment, block_comment) {
            (None, None) => {
                out.push_str(rest);
                return out;
            }
            (Some(line), block) if block.map_or(true, |b| line < b) => {
                out.push_str(&rest[..line]);
                match rest[line..].find('\n') {
                    Some(newline) => rest = &rest[line + newline..],
                    None => return out,
                }
            }
            (_, Some(block)) => {
                out.push_str(&rest[..block]);
                match rest[block..].find("*/") {
                    Some(end) => rest = &rest[block + end + 2..],
                    None => return out,
                }
            }
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    const GRID: &str = indoc! {r#"
        package org.example.components;

        import org.apache.tapestry5.BindingConstants;
        import org.apache.tapestry5.annotations.Parameter;

        /**
         * Renders a grid of rows.
         */
        public class Grid extends BaseComponent {

            @Parameter(required = true)
            private Object source;

            @Parameter(defaultPrefix = BindingConstants.LITERAL)
            private String title;

            @Parameter(name = "rowsPerPage", defaultPrefix = BindingConstants.LITERAL)
            private int _rows; // sigil stripped

            private boolean visible;

            public String getCaption() {
                return title;
            }
        }
    "#};

    #[test]
    fn scans_package_class_and_superclass() {
        let facts = scan_class_source(GRID).unwrap();
        assert_eq!(facts.fqn, "org.example.components.Grid");
        assert_eq!(facts.name, "Grid");
        assert_eq!(facts.package, "org.example.components");
        assert_eq!(facts.superclass.as_deref(), Some("BaseComponent"));
        assert!(facts.is_public);
    }

    #[test]
    fn parameters_keep_declaration_order_and_annotation_facts() {
        let facts = scan_class_source(GRID).unwrap();
        let names: Vec<&str> = facts.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["source", "title", "rowsPerPage"]);

        let source = &facts.parameters[0];
        assert!(source.required);
        assert_eq!(source.default_prefix, BindingPrefix::Prop);
        assert_eq!(source.ty, JavaType::Object("java.lang.Object".to_string()));

        let title = &facts.parameters[1];
        assert!(!title.required);
        assert_eq!(title.default_prefix, BindingPrefix::Literal);
        assert!(title.ty.is_string());

        let rows = &facts.parameters[2];
        assert_eq!(rows.ty, JavaType::Primitive(PrimitiveType::Int));
    }

    #[test]
    fn fields_and_getters_become_properties() {
        let facts = scan_class_source(GRID).unwrap();
        assert!(facts.property("visible").is_some());
        assert!(facts.property("caption").is_some());
        assert_eq!(
            facts.property("rows").unwrap().ty,
            JavaType::Primitive(PrimitiveType::Int)
        );
    }

    #[test]
    fn multiline_parameter_annotation_parses() {
        let source = indoc! {r#"
            package p;
            public class C {
                @Parameter(required = true,
                           defaultPrefix = BindingConstants.MESSAGE)
                private String label;
            }
        "#};
        let facts = scan_class_source(source).unwrap();
        assert_eq!(facts.parameters.len(), 1);
        assert_eq!(facts.parameters[0].default_prefix, BindingPrefix::Message);
        assert!(facts.parameters[0].required);
    }

    #[test]
    fn no_class_declaration_yields_none() {
        assert!(scan_class_source("package p;\n").is_none());
    }

    #[test]
    fn primitive_and_wrapper_names() {
        assert_eq!(JavaType::from_source("boolean").name(), "boolean");
        assert_eq!(JavaType::from_source("Integer").fqn(), "java.lang.Integer");
        assert_eq!(
            JavaType::from_source("java.util.List<String>").fqn(),
            "java.util.List"
        );
        assert_eq!(
            JavaType::Object("java.lang.Integer".to_string()).unboxed(),
            Some(PrimitiveType::Int)
        );
    }
}
