//! # titleledger
//!
//! Dispatcher shims around `titleledger-core`: a clap CLI and an axum HTTP
//! API that forward operation names and string arguments to the registry.

pub mod api;
pub mod cli;
pub mod config;
