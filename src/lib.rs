//! Per-client rate limiting gatekeeper for an origin HTTP server.
//!
//! Requests carrying a client identity header are counted in a shared
//! fixed-window store. Over-limit clients are sent to an unblock flow and
//! regain access through the admin override or a Turnstile challenge.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod unblock;
pub mod verifier;
