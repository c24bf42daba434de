//! Donation checkout server.
//!
//! The thin orchestration layer a merchant runs in front of the
//! payment gateway: it creates payment intents with server-computed
//! amounts, amends them when the customer toggles a donation, and
//! reconciles final outcomes from signed webhook events, issuing a
//! fund transfer to the organization account for succeeded donating
//! payments. The gateway remains the sole source of truth for an
//! intent's state; this process keeps no per-intent state and no
//! locks.
//!
//! # Modules
//!
//! - [`routes`] — intent lifecycle endpoints (plus health and metrics)
//! - [`webhook`] — webhook verification and event routing
//! - [`pricing`] — server-authoritative amount policy
//! - [`config`] — startup configuration from the environment
//! - [`state`] — shared read-only [`AppState`](state::AppState)
//! - [`error`] — request-error to HTTP-status mapping
//! - [`metrics`] — Prometheus counters for payment operations

pub mod config;
pub mod error;
pub mod metrics;
pub mod pricing;
pub mod routes;
pub mod state;
pub mod webhook;
