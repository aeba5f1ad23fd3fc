//! # CLI Module
//!
//! Command-line entry point for the `routectx` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Start the demo service:
//!
//! ```bash
//! routectx serve --config server.yaml --addr 0.0.0.0:8080
//! ```
//!
//! Stops on SIGINT or SIGTERM.
//!
//! ### `routes`
//!
//! Print the compiled route table:
//!
//! ```bash
//! routectx routes
//! ```
//!
//! Both read an optional YAML config (see [`crate::config`]) and apply the
//! `ROUTECTX_*` environment overrides.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{demo_router, route_table, run, run_cli, Cli, Commands, ProfileForm};
