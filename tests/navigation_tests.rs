//! Class ⇄ template navigation resolver against on-disk fixture projects.

mod common;

use tapestry_language_server::core::artifact::Artifact;
use tapestry_language_server::core::navigation::{resolve_navigation_target, NavigationMode};

use common::{standard_project, FixtureProject};

#[test]
fn template_to_class_and_back_round_trip() {
    let project = standard_project();
    let model = project.model();

    let template_path = project.path("src/main/java/org/example/pages/Index.tml");
    let class_path = project.path("src/main/java/org/example/pages/Index.java");

    let template = Artifact::from_path(&template_path).unwrap();
    let class = Artifact::from_path(&class_path).unwrap();

    assert_eq!(
        resolve_navigation_target(&model, &template, NavigationMode::Bidirectional),
        Some(class_path.clone())
    );
    assert_eq!(
        resolve_navigation_target(&model, &class, NavigationMode::Bidirectional),
        Some(template_path)
    );
}

#[test]
fn class_without_template_yields_none() {
    let project = standard_project();
    let model = project.model();

    // PageLink declares no .tml anywhere.
    let class_path = project.path("src/main/java/org/example/components/PageLink.java");
    let class = Artifact::from_path(&class_path).unwrap();
    assert_eq!(
        resolve_navigation_target(&model, &class, NavigationMode::ClassToTemplate),
        None
    );
}

#[test]
fn mixin_never_navigates_to_a_template() {
    let project = standard_project();
    // Even with a template-shaped sibling on disk, mixins do not support
    // templates.
    project.write(
        "src/main/java/org/example/mixins/Confirm.tml",
        "<html></html>\n",
    );
    let model = project.model();

    let class_path = project.path("src/main/java/org/example/mixins/Confirm.java");
    let class = Artifact::from_path(&class_path).unwrap();
    assert_eq!(
        resolve_navigation_target(&model, &class, NavigationMode::ClassToTemplate),
        None
    );
}

#[test]
fn mode_and_artifact_kind_must_agree() {
    let project = standard_project();
    let model = project.model();

    let template_path = project.path("src/main/java/org/example/pages/Index.tml");
    let class_path = project.path("src/main/java/org/example/pages/Index.java");
    let template = Artifact::from_path(&template_path).unwrap();
    let class = Artifact::from_path(&class_path).unwrap();

    assert_eq!(
        resolve_navigation_target(&model, &template, NavigationMode::ClassToTemplate),
        None
    );
    assert_eq!(
        resolve_navigation_target(&model, &class, NavigationMode::TemplateToClass),
        None
    );
}

#[test]
fn unknown_template_yields_none() {
    let project = standard_project();
    let stray = project.write("src/main/webapp/Stray.tml", "<html></html>\n");
    let model = project.model();

    let template = Artifact::from_path(&stray).unwrap();
    assert_eq!(
        resolve_navigation_target(&model, &template, NavigationMode::Bidirectional),
        None
    );
}

#[test]
fn inherited_template_is_found_after_own() {
    let project = standard_project();
    project.write(
        "src/main/java/org/example/base/BasePage.java",
        r#"package org.example.base;

public class BasePage {
}
"#,
    );
    let base_template = project.write(
        "src/main/java/org/example/base/BasePage.tml",
        "<html></html>\n",
    );
    project.write(
        "src/main/java/org/example/pages/About.java",
        r#"package org.example.pages;

import org.example.base.BasePage;

public class About extends BasePage {
}
"#,
    );
    let model = project.model();

    let class_path = project.path("src/main/java/org/example/pages/About.java");
    let class = Artifact::from_path(&class_path).unwrap();
    assert_eq!(
        resolve_navigation_target(&model, &class, NavigationMode::ClassToTemplate),
        Some(base_template)
    );
}

#[test]
fn own_template_wins_over_inherited() {
    let project = standard_project();
    project.write(
        "src/main/java/org/example/base/BasePage.java",
        "package org.example.base;\n\npublic class BasePage {\n}\n",
    );
    project.write(
        "src/main/java/org/example/base/BasePage.tml",
        "<html></html>\n",
    );
    project.write(
        "src/main/java/org/example/pages/About.java",
        "package org.example.pages;\n\npublic class About extends BasePage {\n}\n",
    );
    let own_template = project.write(
        "src/main/java/org/example/pages/About.tml",
        "<html></html>\n",
    );
    let model = project.model();

    let class = Artifact::from_path(&project.path("src/main/java/org/example/pages/About.java"))
        .unwrap();
    assert_eq!(
        resolve_navigation_target(&model, &class, NavigationMode::ClassToTemplate),
        Some(own_template)
    );
}

#[test]
fn template_under_resources_root_pairs_with_class() {
    let project = FixtureProject::new();
    project.write(
        "src/main/java/org/example/pages/Contact.java",
        "package org.example.pages;\n\npublic class Contact {\n}\n",
    );
    let template = project.write(
        "src/main/resources/org/example/pages/Contact.tml",
        "<html></html>\n",
    );
    let model = project.model();

    let class_path = project.path("src/main/java/org/example/pages/Contact.java");
    let class = Artifact::from_path(&class_path).unwrap();
    assert_eq!(
        resolve_navigation_target(&model, &class, NavigationMode::ClassToTemplate),
        Some(template.clone())
    );

    let template_artifact = Artifact::from_path(&template).unwrap();
    assert_eq!(
        resolve_navigation_target(&model, &template_artifact, NavigationMode::TemplateToClass),
        Some(class_path)
    );
}

#[test]
fn non_public_class_does_not_navigate_in_either_direction() {
    let project = FixtureProject::new();
    let class_path = project.write(
        "src/main/java/org/example/pages/Hidden.java",
        "package org.example.pages;\n\nclass Hidden {\n}\n",
    );
    let template = project.write(
        "src/main/java/org/example/pages/Hidden.tml",
        "<html></html>\n",
    );
    let model = project.model();

    // No public type means no navigation, even with the template on disk.
    let class = Artifact::from_path(&class_path).unwrap();
    assert_eq!(
        resolve_navigation_target(&model, &class, NavigationMode::ClassToTemplate),
        None
    );

    let template_artifact = Artifact::from_path(&template).unwrap();
    assert_eq!(
        resolve_navigation_target(&model, &template_artifact, NavigationMode::TemplateToClass),
        None
    );
}
