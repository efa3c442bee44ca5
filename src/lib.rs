pub mod agent;
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod insights;
pub mod mcp;
pub mod models;
pub mod normalize;
pub mod state;
pub mod utils;
pub mod webhook;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
