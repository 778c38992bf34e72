//! Class to template navigation resolver (and back).
//!
//! Given a source artifact and a requested mode, computes the file that
//! logically pairs with it. Every miss (no element model, no template, no
//! backing type) degrades to `None`; the server layer turns that into the
//! fixed "couldn't navigate" notice.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::artifact::Artifact;
use super::project::TapestryProjectModel;

/// Which pairing direction a navigation request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// Only meaningful for class artifacts exposing a public type.
    ClassToTemplate,
    /// Only meaningful for template artifacts.
    TemplateToClass,
    /// Usable from either side.
    Bidirectional,
}

impl NavigationMode {
    fn allows_class_to_template(self) -> bool {
        matches!(
            self,
            NavigationMode::ClassToTemplate | NavigationMode::Bidirectional
        )
    }

    fn allows_template_to_class(self) -> bool {
        matches!(
            self,
            NavigationMode::TemplateToClass | NavigationMode::Bidirectional
        )
    }
}

/// User-facing notice shown when nothing pairs with the source file.
pub const CANT_NAVIGATE_MESSAGE: &str = "Couldn't find a file to navigate to.";
/// Title accompanying [`CANT_NAVIGATE_MESSAGE`].
pub const CANT_NAVIGATE_TITLE: &str = "Not Tapestry file";

/// Resolves the file paired with `artifact` under `mode`, or `None` when the
/// combination is disallowed or any lookup misses.
pub fn resolve_navigation_target(
    model: &TapestryProjectModel,
    artifact: &Artifact,
    mode: NavigationMode,
) -> Option<PathBuf> {
    match artifact {
        Artifact::Class(class) if mode.allows_class_to_template() => {
            let element = model.element_for_class(&class.path)?;
            // Navigation starts from the element's public type; a
            // package-private class has none.
            model.backing_type(element)?;
            if !model.supports_template(element) {
                debug!("{} does not support templates", element.name);
                return None;
            }
            // Single-template assumption: first non-null entry wins, own
            // templates before inherited ones.
            model
                .templates(element, true)
                .into_iter()
                .next()
        }
        Artifact::Template(template) if mode.allows_template_to_class() => {
            let element = model.element_for_template(&template.path)?;
            model.backing_type(element)?;
            model.class_path(element).map(Path::to_path_buf)
        }
        _ => None,
    }
}
