//! Shared themes, per-weblog overrides and render-time template resolution.
//!
//! Data flows leaves-first: [`descriptor`] parses `theme.json`, [`shared`]
//! assembles a [`shared::SharedTheme`] from it, [`registry`] publishes the
//! assembled themes, [`effective`] merges a shared theme with a weblog's
//! overrides, [`resolver`] turns a template reference into renderable content
//! and [`switch`] validates and commits theme changes.

pub mod descriptor;
pub mod effective;
pub mod loader;
pub mod registry;
pub mod resolver;
pub mod role;
pub mod shared;
pub mod store;
pub mod switch;

#[cfg(test)]
pub(crate) mod testing;

pub use role::{Derivation, RenditionKind, TemplateRole};

/// Name of the descriptor file at the root of every theme directory.
pub const DESCRIPTOR_FILE: &str = "theme.json";
