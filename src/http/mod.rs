//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → handlers.rs
//!         POST /ingest  → body limit, decode, validate, Service::submit
//!         GET  /metrics → counters + breaker state
//!         GET  /health  → queue depth/capacity, open breaker flag
//! ```
//!
//! # Status Codes
//! - 202 accepted, 400 invalid payload, 413 body too large, 429 queue full
//! - 503 while shutting down, 405 wrong method (Axum default)

pub mod handlers;
pub mod server;

pub use server::HttpServer;
