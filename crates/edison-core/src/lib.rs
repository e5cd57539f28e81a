//! # edison-core
//!
//! Shared vocabulary for the Edison telemetry feed.
//!
//! - **Protocol**: [`Command`] (client → server text commands) and [`Frame`]
//!   (server → client JSON frames, demultiplexed by their `type` field)
//! - **Dictionary**: the server's catalog of subsystems and measurements
//! - **Series**: index-based view over a run of [`TelemetryPoint`]s
//! - **Errors**: [`FeedError`] and [`FrameError`] via `thiserror`
//! - **Logging**: `tracing` subscriber bootstrap and log capture for tests

#![deny(unsafe_code)]

pub mod constants;
pub mod dictionary;
pub mod errors;
pub mod logging;
pub mod protocol;
pub mod series;

pub use dictionary::{Dictionary, Measurement, Subsystem};
pub use errors::{FeedError, FrameError};
pub use protocol::{Command, DataFrame, Frame, HistoryFrame, TelemetryPoint};
pub use series::TelemetrySeries;
