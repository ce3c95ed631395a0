//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` as the first argument. Methods that take part in a larger
//! transaction accept any `PgExecutor` instead, so callers can pass either the
//! pool or `&mut *tx`.

pub mod weblog_repo;
pub mod weblog_template_repo;

pub use weblog_repo::WeblogRepo;
pub use weblog_template_repo::WeblogTemplateRepo;
