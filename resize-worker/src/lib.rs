//! Resize worker
//!
//! Consumes upload notifications from SQS and writes a fixed-size JPEG thumbnail
//! for every new image under the input prefix.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Health check endpoint
pub mod health;

/// Per-event orchestration
pub mod pipeline;

/// Image transform
pub mod transform;

/// Configuration types
pub mod types;

/// Queue listener and processor pool
pub mod worker;
