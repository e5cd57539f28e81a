//! # edison-adapter
//!
//! WebSocket adapter between a host application and the Edison telemetry
//! server.
//!
//! [`TelemetryFeedAdapter`] owns a single connection and exposes:
//! - [`dictionary`](TelemetryFeedAdapter::dictionary): memoized, resolves once
//! - [`history`](TelemetryFeedAdapter::history): one in-flight request per id
//! - [`subscribe`](TelemetryFeedAdapter::subscribe) /
//!   [`unsubscribe`](TelemetryFeedAdapter::unsubscribe): fire-and-forget
//! - [`on_data`](TelemetryFeedAdapter::on_data): listeners for every live frame
//!
//! Host-side glue should depend on the [`TelemetrySource`] trait rather than
//! the concrete adapter.

#![deny(unsafe_code)]

pub mod adapter;
pub mod config;
mod connection;
pub mod source;
mod state;

pub use adapter::TelemetryFeedAdapter;
pub use config::AdapterConfig;
pub use source::TelemetrySource;
pub use state::{DataListener, Pending};
