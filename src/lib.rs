//! header-filter is a response header filter packaged as a tower layer.
//!
//! For every request it wraps, the filter injects configured response
//! headers the inner service did not set, defaults the response character
//! encoding to UTF-8, appends `; charset=utf-8` to bare XML content types,
//! and optionally dumps the request and response keyed by a correlation id.
//! The crate also ships a binary that runs the filter in front of a single
//! upstream.
//!
//! # Architecture
//!
//! - [`filter`] -- The [`HeaderFilterLayer`](filter::HeaderFilterLayer)
//!   tower layer: init-param parsing, URL-pattern resolution, header
//!   post-processing, correlation ids, and dumps.
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Config file model, loading, and validation.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`proxy`] -- Upstream forwarding, the inner service of the binary.
//! - [`server`] -- Axum server setup, shared application state, HTTP client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod filter;
pub mod health;
pub mod logging;
pub mod proxy;
pub mod server;
