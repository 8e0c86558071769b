//! Image gallery backend service

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Gallery listing
pub mod gallery;

/// HTTP routes
pub mod routes;

/// Server setup
pub mod server;

/// Signed URL cache
pub mod signed_url_cache;

/// Configuration and error types
pub mod types;
