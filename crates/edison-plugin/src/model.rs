//! Object models derived from the server dictionary.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use edison_adapter::TelemetrySource;
use edison_core::constants::{
    BOARD_TYPE, MEASUREMENT_TYPE, ROOT_ID, SUBSYSTEM_TYPE, TELEMETRY_SOURCE, object_id,
    strip_namespace,
};
use edison_core::{Dictionary, FeedError, Measurement};

/// Object identifier → model.
pub type Taxonomy = BTreeMap<String, ObjectModel>;

/// A host object: the board, a subsystem, or a measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectModel {
    /// Type key (`Edison.board`, `Edison.subsystem`, `Edison.measurement`).
    #[serde(rename = "type")]
    pub type_key: String,
    /// Display name.
    pub name: String,
    /// Child object identifiers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub composition: Vec<String>,
    /// Present on measurements only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TelemetryDescriptor>,
}

/// How the host requests and renders a measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryDescriptor {
    /// Measurement identifier as the server knows it.
    pub key: String,
    /// Telemetry source key.
    pub source: String,
    /// Range axes.
    pub ranges: Vec<RangeDescriptor>,
}

/// A range axis of a measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeDescriptor {
    /// Field of a point holding the range value.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Units label.
    pub units: String,
    /// `number` or `string`.
    pub format: String,
}

/// Map a dictionary value type to a host display format.
pub fn value_format(value_type: &str) -> &'static str {
    match value_type {
        "string" => "string",
        _ => "number",
    }
}

fn measurement_model(measurement: &Measurement) -> ObjectModel {
    ObjectModel {
        type_key: MEASUREMENT_TYPE.into(),
        name: measurement.name.clone(),
        composition: Vec::new(),
        telemetry: Some(TelemetryDescriptor {
            key: measurement.identifier.clone(),
            source: TELEMETRY_SOURCE.into(),
            ranges: vec![RangeDescriptor {
                key: "value".into(),
                name: "Value".into(),
                units: measurement.units.clone(),
                format: value_format(&measurement.value_type).into(),
            }],
        }),
    }
}

/// Build every object model the dictionary describes, root included.
///
/// A subsystem or measurement whose id lands on the root id is skipped.
pub fn build_taxonomy(dictionary: &Dictionary) -> Taxonomy {
    let mut taxonomy = Taxonomy::new();

    let root_composition = dictionary
        .subsystems
        .iter()
        .map(|s| object_id(&s.identifier))
        .filter(|id| id != ROOT_ID)
        .collect();
    let _ = taxonomy.insert(
        ROOT_ID.into(),
        ObjectModel {
            type_key: BOARD_TYPE.into(),
            name: dictionary.name.clone(),
            composition: root_composition,
            telemetry: None,
        },
    );

    for subsystem in &dictionary.subsystems {
        let composition = subsystem
            .measurements
            .iter()
            .map(|m| object_id(&m.identifier))
            .filter(|id| id != ROOT_ID)
            .collect();
        let id = object_id(&subsystem.identifier);
        if id == ROOT_ID {
            warn!(%id, "subsystem id collides with root, skipping");
        } else {
            let _ = taxonomy.insert(
                id,
                ObjectModel {
                    type_key: SUBSYSTEM_TYPE.into(),
                    name: subsystem.name.clone(),
                    composition,
                    telemetry: None,
                },
            );
        }
        for measurement in &subsystem.measurements {
            let id = object_id(&measurement.identifier);
            if id == ROOT_ID {
                warn!(%id, "measurement id collides with root, skipping");
                continue;
            }
            let _ = taxonomy.insert(id, measurement_model(measurement));
        }
    }

    taxonomy
}

/// Resolves object models for the `Edison:` namespace.
pub struct ModelProvider {
    source: Arc<dyn TelemetrySource>,
    taxonomy: OnceCell<Arc<Taxonomy>>,
}

impl ModelProvider {
    /// Create a provider backed by `source`.
    pub fn new(source: Arc<dyn TelemetrySource>) -> Self {
        Self {
            source,
            taxonomy: OnceCell::new(),
        }
    }

    /// Models for the requested ids that this plugin owns.
    ///
    /// Ids outside the namespace are skipped. When none are ours the
    /// dictionary is never requested.
    pub async fn get_models(&self, ids: &[&str]) -> Result<Taxonomy, FeedError> {
        let ours: Vec<&str> = ids
            .iter()
            .copied()
            .filter(|id| strip_namespace(id).is_some())
            .collect();
        if ours.is_empty() {
            return Ok(Taxonomy::new());
        }

        let taxonomy = self.taxonomy().await?;
        let models: Taxonomy = ours
            .into_iter()
            .filter_map(|id| taxonomy.get(id).map(|m| (id.to_owned(), m.clone())))
            .collect();
        debug!(requested = ids.len(), resolved = models.len(), "resolved models");
        Ok(models)
    }

    /// The full taxonomy, built once from the dictionary.
    pub async fn taxonomy(&self) -> Result<Arc<Taxonomy>, FeedError> {
        self.taxonomy
            .get_or_try_init(|| async {
                let dictionary = self.source.dictionary().await?;
                Ok::<_, FeedError>(Arc::new(build_taxonomy(&dictionary)))
            })
            .await
            .cloned()
    }
}
