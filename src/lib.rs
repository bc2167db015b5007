//! # Live Serve Library
//!
//! This library provides the core functionality for live-serve, a local
//! development file server. It serves a directory over HTTP, watches it for
//! changes, and tells every open browser tab to reload when files change.
//!
//! ## Overview
//!
//! The library is organized into several modules that handle different aspects of the application:
//!
//! - `config`: Server settings with defaults and an optional JSON5 file
//! - `error`: Defines custom error types for consistent error handling
//! - `inject`: Adds the reload script to HTML responses
//! - `registry`: Tracks connected browsers and broadcasts reload messages
//! - `debounce`: Collapses bursts of triggers into one action
//! - `watcher`: Watches the directory tree for relevant changes
//! - `socket`: The WebSocket endpoint browsers connect to
//! - `listing`: Directory listings for folders without an index page
//! - `server`: Runs the web server and wires everything together
//!
//! ## Getting Started
//!
//! ```no_run
//! use live_serve::{config::ServerConfig, server};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), live_serve::error::LiveServeError> {
//!     let cancel_token = CancellationToken::new();
//!     server::run(ServerConfig::default(), cancel_token).await
//! }
//! ```
//!
//! ## Architecture
//!
//! A single background task runs the watcher loop. Each browser connection runs
//! its own read loop, and every HTTP request is handled on its own task. The
//! only shared mutable state is the client registry and the pending debounce
//! timer, and each owns its own lock.

/// Custom error types module
///
/// Defines the `LiveServeError` enum used across the crate.
pub mod error;

/// Configuration management module
///
/// Holds the `ServerConfig` struct, its defaults, and JSON5 file loading.
pub mod config;

/// HTML response interception module
///
/// Middleware and body wrapper that splice the live reload script in front of
/// the closing body tag of HTML pages.
pub mod inject;

/// Reload client registry module
pub mod registry;

/// Debounce timer module
pub mod debounce;

/// File watching module
///
/// Registers the directory tree with the OS notification backend, filters out
/// noise, and debounces change events.
pub mod watcher;

/// Reload socket module
pub mod socket;

/// Directory listing module
pub mod listing;

/// Server operations module
///
/// Builds the Axum router, binds the listener, starts the watcher, and handles
/// graceful shutdown.
pub mod server;
