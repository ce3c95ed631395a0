//! Theme and template resolution engine for the weblog platform.
//!
//! Shared themes are read from disk once and published through a
//! [`themes::registry::ThemeRegistry`]. Each weblog sees its shared theme
//! merged with its persisted overrides through an
//! [`themes::effective::EffectiveThemeView`]. This crate has no database
//! dependency; persistence and cache eviction are reached through the traits
//! in [`themes::store`].

pub mod error;
pub mod themes;
pub mod types;
