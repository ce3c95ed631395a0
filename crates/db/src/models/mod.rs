//! Row structs for the weblog tables.
//!
//! Each submodule contains a `FromRow` entity matching the database row and
//! the conversion into the engine type it backs.

pub mod weblog;
pub mod weblog_template;
