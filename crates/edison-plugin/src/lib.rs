//! # edison-plugin
//!
//! Glue between a telemetry visualization host and [`edison_adapter`].
//!
//! - [`manifest`]: the plain registration record the host's extension
//!   registry consumes
//! - [`model`]: object models (board → subsystems → measurements) built from
//!   the server dictionary
//! - [`initializer`]: fills the root board's composition once the dictionary
//!   arrives
//! - [`telemetry`]: history packaging and per-id live fan-out

#![deny(unsafe_code)]

pub mod initializer;
pub mod manifest;
pub mod model;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use initializer::{ObjectService, RootInitializer};
pub use manifest::PluginManifest;
pub use model::{ModelProvider, ObjectModel, Taxonomy, build_taxonomy};
pub use telemetry::{Subscription, TelemetryPackage, TelemetryProvider, TelemetryRequest};
