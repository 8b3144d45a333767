//! HTTP server for the bracket engine.

pub mod api;
pub mod config;
pub mod logging;
