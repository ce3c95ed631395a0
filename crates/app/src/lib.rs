//! Process bootstrap for the weblog theme engine: configuration, logging,
//! the render-output cache and the shared application state.

pub mod config;
pub mod error;
pub mod render_cache;
pub mod state;
pub mod telemetry;
