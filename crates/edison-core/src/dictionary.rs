//! Measurement dictionary served by the telemetry server.
//!
//! The dictionary is a two-level catalog: the board owns subsystems, and each
//! subsystem owns the measurements that can be requested by identifier.

use serde::{Deserialize, Serialize};

/// Catalog of everything the server can report on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    /// Board identifier (e.g. `"edison"`).
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Subsystems in server order.
    #[serde(default)]
    pub subsystems: Vec<Subsystem>,
}

/// A group of related measurements (e.g. power, temperature).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsystem {
    /// Subsystem identifier (e.g. `"pwr"`).
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Measurements in server order.
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

/// A single measurable value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Measurement identifier; also the subscription id on the wire.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Value type as declared by the server (`float`, `integer`, `string`, ...).
    #[serde(rename = "type", default)]
    pub value_type: String,
    /// Engineering units; empty when unitless.
    #[serde(default)]
    pub units: String,
}

impl Dictionary {
    /// Look up a subsystem by identifier.
    pub fn subsystem(&self, identifier: &str) -> Option<&Subsystem> {
        self.subsystems.iter().find(|s| s.identifier == identifier)
    }

    /// Look up a measurement by identifier across all subsystems.
    pub fn measurement(&self, identifier: &str) -> Option<&Measurement> {
        self.subsystems
            .iter()
            .flat_map(|s| s.measurements.iter())
            .find(|m| m.identifier == identifier)
    }

    /// All measurement identifiers, in dictionary order.
    pub fn measurement_ids(&self) -> Vec<&str> {
        self.subsystems
            .iter()
            .flat_map(|s| s.measurements.iter())
            .map(|m| m.identifier.as_str())
            .collect()
    }
}
