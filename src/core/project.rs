//! Tapestry project model: which classes are pages, components and mixins,
//! which templates belong to them, and how tags resolve to component models.
//!
//! The model is built by scanning a workspace root for `.java` and `.tml`
//! files. Tapestry's layout conventions drive classification: classes under a
//! `components`, `pages` or `mixins` package are presentation elements, their
//! element name is the package path below that segment plus the class name,
//! and a template is a `.tml` file sharing the class file's stem, either next
//! to the class or under a parallel `resources` source root.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::java::{self, JavaClassFacts, JavaProperty, JavaType, ParameterDescriptor};
use crate::tml::TmlTag;

/// Namespace prefix identifying Tapestry tags and attributes in templates.
pub const TAPESTRY_NAMESPACE_PREFIX: &str = "t";

/// What kind of presentation element a class is, by its owning package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Page,
    Component,
    Mixin,
}

impl ElementKind {
    fn from_package_segment(segment: &str) -> Option<Self> {
        Some(match segment {
            "pages" => ElementKind::Page,
            "components" => ElementKind::Component,
            "mixins" => ElementKind::Mixin,
            _ => return None,
        })
    }
}

/// A resolved presentation element: name, kind and backing class.
#[derive(Debug, Clone)]
pub struct ComponentModel {
    /// Normalized element name, lowercase with `/` separating folders
    /// (`admin/grid`).
    pub name: String,
    pub kind: ElementKind,
    /// Fully qualified name of the backing class.
    pub class_fqn: String,
}

struct ClassEntry {
    path: PathBuf,
    facts: JavaClassFacts,
    /// Templates declared by this class itself, in discovery order.
    templates: Vec<PathBuf>,
}

/// The project model for one workspace root. Immutable once built; rebuilt
/// through [`ProjectModelCache`] when sources change.
pub struct TapestryProjectModel {
    root: PathBuf,
    classes: FxHashMap<String, ClassEntry>,
    simple_names: FxHashMap<String, Vec<String>>,
    elements: Vec<ComponentModel>,
    components_by_name: FxHashMap<String, usize>,
    pages_by_name: FxHashMap<String, usize>,
    elements_by_class_path: FxHashMap<PathBuf, usize>,
    elements_by_template_path: FxHashMap<PathBuf, usize>,
}

impl TapestryProjectModel {
    /// Scans `root` and builds the model. Unreadable files are logged and
    /// skipped; an empty directory yields an empty (but valid) model.
    pub fn build(root: &Path) -> Self {
        let mut classes: FxHashMap<String, ClassEntry> = FxHashMap::default();
        let mut simple_names: FxHashMap<String, Vec<String>> = FxHashMap::default();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("java") {
                continue;
            }
            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(err) => {
                    warn!("skipping unreadable source {}: {}", path.display(), err);
                    continue;
                }
            };
            let Some(facts) = java::scan_class_source(&source) else {
                continue;
            };
            let templates = discover_templates(path);
            simple_names
                .entry(facts.name.clone())
                .or_default()
                .push(facts.fqn.clone());
            classes.insert(
                facts.fqn.clone(),
                ClassEntry {
                    path: path.to_path_buf(),
                    facts,
                    templates,
                },
            );
        }

        let mut elements = Vec::new();
        let mut components_by_name = FxHashMap::default();
        let mut pages_by_name = FxHashMap::default();
        let mut elements_by_class_path = FxHashMap::default();
        let mut elements_by_template_path = FxHashMap::default();

        for entry in classes.values() {
            let Some((kind, name)) = element_identity(&entry.facts) else {
                continue;
            };
            let index = elements.len();
            elements.push(ComponentModel {
                name: name.clone(),
                kind,
                class_fqn: entry.facts.fqn.clone(),
            });
            match kind {
                ElementKind::Component => {
                    components_by_name.insert(name, index);
                }
                ElementKind::Page => {
                    pages_by_name.insert(name, index);
                }
                // Mixins attach to other components; they are never
                // addressable as tags themselves.
                ElementKind::Mixin => {}
            }
            elements_by_class_path.insert(entry.path.clone(), index);
            for template in &entry.templates {
                elements_by_template_path.insert(template.clone(), index);
            }
        }

        debug!(
            "project model for {}: {} class(es), {} element(s)",
            root.display(),
            classes.len(),
            elements.len()
        );

        TapestryProjectModel {
            root: root.to_path_buf(),
            classes,
            simple_names,
            elements,
            components_by_name,
            pages_by_name,
            elements_by_class_path,
            elements_by_template_path,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the component model a template tag refers to: `t:`-namespaced
    /// tags by their local name, plain tags by their `t:type` attribute.
    /// Tags identified only by `t:id` have no resolvable type here.
    pub fn component_for_tag(&self, tag: &TmlTag) -> Option<&ComponentModel> {
        if tag.prefix() == Some(TAPESTRY_NAMESPACE_PREFIX) {
            return self.component(tag.local_name());
        }
        let type_attr = tag.attribute("t:type")?;
        self.component(&type_attr.value)
    }

    /// Looks up a component by element name (`grid`, `admin.grid`,
    /// `admin/grid`), case-insensitively. Mixins are not addressable here.
    pub fn component(&self, name: &str) -> Option<&ComponentModel> {
        let normalized = normalize_element_name(name);
        self.components_by_name
            .get(&normalized)
            .map(|&index| &self.elements[index])
    }

    /// Looks up a page by element name.
    pub fn page(&self, name: &str) -> Option<&ComponentModel> {
        let normalized = normalize_element_name(name);
        self.pages_by_name
            .get(&normalized)
            .map(|&index| &self.elements[index])
    }

    /// The element whose template is the given file, if any.
    pub fn element_for_template(&self, template: &Path) -> Option<&ComponentModel> {
        self.elements_by_template_path
            .get(template)
            .map(|&index| &self.elements[index])
    }

    /// The element backed by the given class file, if any.
    pub fn element_for_class(&self, class: &Path) -> Option<&ComponentModel> {
        self.elements_by_class_path
            .get(class)
            .map(|&index| &self.elements[index])
    }

    /// Whether the element may have a template at all. Mixins never do.
    pub fn supports_template(&self, element: &ComponentModel) -> bool {
        element.kind != ElementKind::Mixin
    }

    /// The element's backing type. Undefined when the class is not public,
    /// matching "exposes a public type".
    pub fn backing_type(&self, element: &ComponentModel) -> Option<JavaType> {
        let entry = self.classes.get(&element.class_fqn)?;
        entry.facts.is_public.then(|| entry.facts.backing_type())
    }

    /// Path of the class file backing an element.
    pub fn class_path(&self, element: &ComponentModel) -> Option<&Path> {
        self.classes
            .get(&element.class_fqn)
            .map(|entry| entry.path.as_path())
    }

    /// Declared parameters of the element, in declaration order.
    pub fn parameters<'a>(&'a self, element: &ComponentModel) -> &'a [ParameterDescriptor] {
        self.classes
            .get(&element.class_fqn)
            .map_or(&[], |entry| entry.facts.parameters.as_slice())
    }

    /// Templates of the element: its own first, then templates inherited from
    /// superclasses when `include_inherited` is set. Order within one class
    /// is discovery order.
    pub fn templates(&self, element: &ComponentModel, include_inherited: bool) -> Vec<PathBuf> {
        let mut templates = Vec::new();
        let mut fqn = Some(element.class_fqn.clone());
        let mut visited = Vec::new();
        while let Some(current) = fqn {
            if visited.contains(&current) {
                break;
            }
            let Some(entry) = self.lookup_class(&current) else {
                break;
            };
            templates.extend(entry.templates.iter().cloned());
            if !include_inherited {
                break;
            }
            visited.push(current);
            fqn = entry
                .facts
                .superclass
                .as_deref()
                .and_then(|superclass| self.resolve_class_name(superclass, &entry.facts.package));
        }
        templates
    }

    /// Resolves a property by name on a type, following the superclass chain.
    pub fn property_of(&self, owner: &JavaType, name: &str) -> Option<&JavaProperty> {
        let mut fqn = Some(owner.fqn().to_string());
        let mut visited = Vec::new();
        while let Some(current) = fqn {
            if visited.contains(&current) {
                return None;
            }
            let entry = self.lookup_class(&current)?;
            if let Some(property) = entry.facts.property(name) {
                return Some(property);
            }
            visited.push(current);
            fqn = entry
                .facts
                .superclass
                .as_deref()
                .and_then(|superclass| self.resolve_class_name(superclass, &entry.facts.package));
        }
        None
    }

    pub fn class_facts(&self, name: &str) -> Option<&JavaClassFacts> {
        self.lookup_class(name).map(|entry| &entry.facts)
    }

    /// Finds a scanned class by qualified name, falling back to a unique
    /// simple-name match; property and parameter types frequently carry only
    /// the simple name the source was written with.
    fn lookup_class(&self, name: &str) -> Option<&ClassEntry> {
        if let Some(entry) = self.classes.get(name) {
            return Some(entry);
        }
        if name.contains('.') {
            return None;
        }
        match self.simple_names.get(name).map(Vec::as_slice) {
            Some([only]) => self.classes.get(only),
            _ => None,
        }
    }

    /// Resolves a possibly-simple class name the way Java source sees it:
    /// qualified names directly, simple names against the same package first
    /// and any unique project-wide match second.
    fn resolve_class_name(&self, name: &str, from_package: &str) -> Option<String> {
        if name.contains('.') {
            return self.classes.contains_key(name).then(|| name.to_string());
        }
        let same_package = if from_package.is_empty() {
            name.to_string()
        } else {
            format!("{from_package}.{name}")
        };
        if self.classes.contains_key(&same_package) {
            return Some(same_package);
        }
        match self.simple_names.get(name).map(Vec::as_slice) {
            Some([only]) => Some(only.clone()),
            _ => None,
        }
    }
}

/// Element kind and normalized name for a scanned class, when its package
/// marks it as a presentation element.
fn element_identity(facts: &JavaClassFacts) -> Option<(ElementKind, String)> {
    let segments: Vec<&str> = facts.package.split('.').collect();
    let (index, kind) = segments
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, segment)| {
            ElementKind::from_package_segment(segment).map(|kind| (index, kind))
        })?;
    let mut parts: Vec<String> = segments[index + 1..]
        .iter()
        .map(|segment| segment.to_ascii_lowercase())
        .collect();
    parts.push(facts.name.to_ascii_lowercase());
    Some((kind, parts.join("/")))
}

/// Tag names address nested component folders with `.` or `/`; element names
/// are stored lowercase with `/`.
fn normalize_element_name(name: &str) -> String {
    name.to_ascii_lowercase().replace('.', "/")
}

/// A class's own templates: a `.tml` sharing the class file stem, either next
/// to the class or under a parallel `resources` source root (the Maven
/// `src/main/java` ⇄ `src/main/resources` convention).
fn discover_templates(class_path: &Path) -> Vec<PathBuf> {
    let mut templates = Vec::new();
    let sibling = class_path.with_extension(super::artifact::TEMPLATE_EXTENSION);
    if sibling.is_file() {
        templates.push(sibling);
    }
    if let Some(mirrored) = mirror_into_resources(class_path) {
        let candidate = mirrored.with_extension(super::artifact::TEMPLATE_EXTENSION);
        if candidate.is_file() && !templates.contains(&candidate) {
            templates.push(candidate);
        }
    }
    templates
}

fn mirror_into_resources(class_path: &Path) -> Option<PathBuf> {
    let components: Vec<&std::ffi::OsStr> = class_path.iter().collect();
    let java_index = components
        .iter()
        .rposition(|component| *component == std::ffi::OsStr::new("java"))?;
    let mut mirrored = PathBuf::new();
    for (index, component) in components.iter().enumerate() {
        if index == java_index {
            mirrored.push("resources");
        } else {
            mirrored.push(*component);
        }
    }
    Some(mirrored)
}

/// Owner-keyed cache of project models with explicit invalidation. The
/// server invalidates the owning root whenever a `.java` or `.tml` file
/// changes, instead of relying on implicit framework caching.
#[derive(Default)]
pub struct ProjectModelCache {
    models: DashMap<PathBuf, Arc<TapestryProjectModel>>,
}

impl ProjectModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached model for `root`, building it on first use.
    pub fn get_or_build(&self, root: &Path) -> Arc<TapestryProjectModel> {
        if let Some(model) = self.models.get(root) {
            return Arc::clone(&model);
        }
        let model = Arc::new(TapestryProjectModel::build(root));
        self.models.insert(root.to_path_buf(), Arc::clone(&model));
        model
    }

    /// Drops the cached model for `root`; the next lookup rebuilds it.
    pub fn invalidate(&self, root: &Path) {
        self.models.remove(root);
    }

    pub fn clear(&self) {
        self.models.clear();
    }
}
