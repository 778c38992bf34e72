//! On-disk fixture projects for integration tests.
//!
//! Builds a Maven-shaped Tapestry project in a temp directory and exposes a
//! freshly scanned project model over it.

use std::fs;
use std::path::{Path, PathBuf};

use tapestry_language_server::core::project::TapestryProjectModel;
use tempfile::TempDir;

pub struct FixtureProject {
    dir: TempDir,
}

impl FixtureProject {
    pub fn new() -> Self {
        FixtureProject {
            dir: TempDir::new().expect("failed to create fixture directory"),
        }
    }

    /// Writes a file at a path relative to the project root, creating parent
    /// directories as needed. Returns the absolute path.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture directories");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn model(&self) -> TapestryProjectModel {
        TapestryProjectModel::build(self.dir.path())
    }
}

/// A representative project: an Index page with properties, a grid component
/// with parameters, a page link component, a mixin, and a user model class.
pub fn standard_project() -> FixtureProject {
    let project = FixtureProject::new();

    project.write(
        "src/main/java/org/example/pages/Index.java",
        r#"package org.example.pages;

import java.util.List;
import org.example.model.User;

public class Index {

    private String title;

    private int count;

    private boolean visible;

    private User user;

    private List users;

    public List getUsers() {
        return users;
    }
}
"#,
    );
    project.write(
        "src/main/java/org/example/pages/Index.tml",
        "<html></html>\n",
    );

    project.write(
        "src/main/java/org/example/model/User.java",
        r#"package org.example.model;

public class User {

    private String name;

    private int age;
}
"#,
    );

    project.write(
        "src/main/java/org/example/components/Grid.java",
        r#"package org.example.components;

import org.apache.tapestry5.BindingConstants;
import org.apache.tapestry5.annotations.Parameter;

public class Grid {

    @Parameter(required = true)
    private Object source;

    @Parameter
    private Object row;

    @Parameter(defaultPrefix = BindingConstants.LITERAL)
    private int rowsPerPage;

    @Parameter(defaultPrefix = BindingConstants.LITERAL)
    private boolean inPlace;
}
"#,
    );
    project.write(
        "src/main/java/org/example/components/Grid.tml",
        "<table></table>\n",
    );

    project.write(
        "src/main/java/org/example/components/PageLink.java",
        r#"package org.example.components;

import org.apache.tapestry5.BindingConstants;
import org.apache.tapestry5.annotations.Parameter;

public class PageLink {

    @Parameter(required = true, defaultPrefix = BindingConstants.LITERAL)
    private String page;
}
"#,
    );

    project.write(
        "src/main/java/org/example/mixins/Confirm.java",
        r#"package org.example.mixins;

import org.apache.tapestry5.annotations.Parameter;

public class Confirm {

    @Parameter
    private String message;
}
"#,
    );

    project
}
