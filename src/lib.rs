//! Tapestry template language server.
//!
//! The library half carries everything the server binary builds on: the TML
//! tag-tree parser, the project model mapping classes to pages, components
//! and mixins, the class ⇄ template navigation resolver, and the template
//! annotation walker that turns unresolved references and impossible
//! parameter coercions into diagnostics.

pub mod core;
pub mod document;
pub mod logging;
pub mod lsp;
pub mod tml;
