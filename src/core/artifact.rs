//! Source artifacts: the two kinds of files navigation pairs up.

use std::path::{Path, PathBuf};

/// File extension of Tapestry template files.
pub const TEMPLATE_EXTENSION: &str = "tml";
/// File extension of component class sources.
pub const CLASS_EXTENSION: &str = "java";

/// A file the navigation resolver understands, as a tagged variant rather
/// than a class hierarchy. Identity is the file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Class(ClassArtifact),
    Template(TemplateArtifact),
}

impl Artifact {
    /// Classifies a file by extension. Anything else is not a Tapestry
    /// artifact.
    pub fn from_path(path: &Path) -> Option<Artifact> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(TEMPLATE_EXTENSION) => Some(
                Artifact::Template(TemplateArtifact {
                    path: path.to_path_buf(),
                }),
            ),
            Some(ext) if ext.eq_ignore_ascii_case(CLASS_EXTENSION) => Some(Artifact::Class(
                ClassArtifact {
                    path: path.to_path_buf(),
                },
            )),
            _ => None,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Artifact::Class(class) => &class.path,
            Artifact::Template(template) => &template.path,
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Artifact::Template(_))
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Artifact::Class(_))
    }
}

/// A compilable type definition that may back a component, page or mixin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassArtifact {
    pub path: PathBuf,
}

/// A markup document defining a component's rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateArtifact {
    pub path: PathBuf,
}
