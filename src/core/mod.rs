//! Core Tapestry semantics: the project model, the class ⇄ template
//! navigation resolver, and the template annotation walker, together with the
//! value-resolver chain and type-coercion predicate they consume.

pub mod annotator;
pub mod artifact;
pub mod coercion;
pub mod java;
pub mod navigation;
pub mod project;
pub mod resolvers;
