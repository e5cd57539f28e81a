//! Registration record for the host's extension registry.
//!
//! Pure data: the host decides what to do with it. Serialized field names
//! match what the registry expects.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use edison_core::constants::{
    BOARD_TYPE, DEFAULT_WS_URL, MEASUREMENT_TYPE, ROOT_ID, SUBSYSTEM_TYPE, TELEMETRY_SOURCE,
};

/// Key of the constant holding the server URL.
pub const WS_URL_CONSTANT: &str = "Edison_WS_URL";

/// Key of the adapter service.
pub const ADAPTER_SERVICE: &str = "Edison.adapter";

/// Resolution priority of a registered extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Used only when nothing else provides the key.
    Fallback,
    /// Preferred over other providers of the key.
    Preferred,
}

/// Top-level registration record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Registry path the bundle is registered under.
    pub bundle: String,
    /// Display name.
    pub name: String,
    /// Extensions grouped by category.
    pub extensions: Extensions,
}

/// Extension categories.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extensions {
    /// Object types.
    pub types: Vec<TypeDefinition>,
    /// Top-level objects.
    pub roots: Vec<RootDefinition>,
    /// Injectable services.
    pub services: Vec<ServiceDefinition>,
    /// Named constants.
    pub constants: Vec<ConstantDefinition>,
    /// Startup hooks.
    pub runs: Vec<RunDefinition>,
    /// Provider components.
    pub components: Vec<ComponentDefinition>,
}

/// An object type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// Display name.
    pub name: String,
    /// Type key.
    pub key: String,
    /// Icon class.
    pub cssclass: String,
    /// Initial model for newly created objects of this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Value>,
    /// Telemetry metadata for measurement types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TypeTelemetry>,
}

/// Telemetry metadata attached to a type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeTelemetry {
    /// Source key telemetry requests are routed by.
    pub source: String,
    /// Domain axes (time).
    pub domains: Vec<Domain>,
}

/// A domain axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    /// Display name.
    pub name: String,
    /// Field of a point holding the domain value.
    pub key: String,
}

/// A root object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootDefinition {
    /// Object identifier.
    pub id: String,
    /// Resolution priority.
    pub priority: Priority,
    /// Initial object model.
    pub model: Value,
}

/// A service and its dependencies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Service key.
    pub key: String,
    /// Implementing type.
    pub implementation: String,
    /// Keys injected on construction.
    pub depends: Vec<String>,
}

/// A named constant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantDefinition {
    /// Constant key.
    pub key: String,
    /// Resolution priority.
    pub priority: Priority,
    /// Constant value.
    pub value: Value,
}

/// A startup hook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunDefinition {
    /// Implementing type.
    pub implementation: String,
    /// Keys injected on construction.
    pub depends: Vec<String>,
}

/// A provider component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    /// Host service this component contributes to.
    pub provides: String,
    /// Component kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Implementing type.
    pub implementation: String,
    /// Keys injected on construction.
    pub depends: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

impl PluginManifest {
    /// The Edison board registration.
    pub fn edison() -> Self {
        let types = vec![
            TypeDefinition {
                name: "Intel Edison".into(),
                key: BOARD_TYPE.into(),
                cssclass: "icon-object".into(),
                model: None,
                telemetry: None,
            },
            TypeDefinition {
                name: "Subsystem".into(),
                key: SUBSYSTEM_TYPE.into(),
                cssclass: "icon-telemetry-panel".into(),
                model: Some(json!({ "composition": [] })),
                telemetry: None,
            },
            TypeDefinition {
                name: "Measurement".into(),
                key: MEASUREMENT_TYPE.into(),
                cssclass: "icon-telemetry-panel".into(),
                model: Some(json!({ "telemetry": {} })),
                telemetry: Some(TypeTelemetry {
                    source: TELEMETRY_SOURCE.into(),
                    domains: vec![Domain {
                        name: "Time".into(),
                        key: "timestamp".into(),
                    }],
                }),
            },
        ];

        let roots = vec![RootDefinition {
            id: ROOT_ID.into(),
            priority: Priority::Preferred,
            model: json!({
                "type": BOARD_TYPE,
                "name": "Intel Edison",
                "composition": [],
            }),
        }];

        Self {
            bundle: "telemetry".into(),
            name: "Edison Telemetry Adapter".into(),
            extensions: Extensions {
                types,
                roots,
                services: vec![ServiceDefinition {
                    key: ADAPTER_SERVICE.into(),
                    implementation: "TelemetryFeedAdapter".into(),
                    depends: strings(&["runtime", WS_URL_CONSTANT]),
                }],
                constants: vec![ConstantDefinition {
                    key: WS_URL_CONSTANT.into(),
                    priority: Priority::Fallback,
                    value: Value::String(DEFAULT_WS_URL.into()),
                }],
                runs: vec![RunDefinition {
                    implementation: "RootInitializer".into(),
                    depends: strings(&[ADAPTER_SERVICE, "objectService"]),
                }],
                components: vec![
                    ComponentDefinition {
                        provides: "modelService".into(),
                        kind: "provider".into(),
                        implementation: "ModelProvider".into(),
                        depends: strings(&[ADAPTER_SERVICE]),
                    },
                    ComponentDefinition {
                        provides: "telemetryService".into(),
                        kind: "provider".into(),
                        implementation: "TelemetryProvider".into(),
                        depends: strings(&[ADAPTER_SERVICE]),
                    },
                ],
            },
        }
    }

    /// The server URL constant, if registered as a string.
    pub fn ws_url(&self) -> Option<&str> {
        self.extensions
            .constants
            .iter()
            .find(|c| c.key == WS_URL_CONSTANT)
            .and_then(|c| c.value.as_str())
    }

    /// Look up a type definition by key.
    pub fn type_definition(&self, key: &str) -> Option<&TypeDefinition> {
        self.extensions.types.iter().find(|t| t.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_falls_back_to_localhost() {
        let manifest = PluginManifest::edison();
        assert_eq!(manifest.ws_url(), Some("ws://localhost:8081"));
        assert_eq!(manifest.extensions.constants[0].priority, Priority::Fallback);
    }

    #[test]
    fn declares_three_types() {
        let manifest = PluginManifest::edison();
        let keys: Vec<_> = manifest.extensions.types.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["Edison.board", "Edison.subsystem", "Edison.measurement"]);
    }

    #[test]
    fn measurement_type_routes_to_edison_source() {
        let manifest = PluginManifest::edison();
        let telemetry = manifest
            .type_definition(MEASUREMENT_TYPE)
            .and_then(|t| t.telemetry.as_ref())
            .unwrap();
        assert_eq!(telemetry.source, "Edison.source");
        assert_eq!(telemetry.domains[0].key, "timestamp");
    }

    #[test]
    fn root_is_preferred_board() {
        let manifest = PluginManifest::edison();
        let root = &manifest.extensions.roots[0];
        assert_eq!(root.id, "Edison:board");
        assert_eq!(root.priority, Priority::Preferred);
        assert_eq!(root.model["type"], "Edison.board");
    }

    #[test]
    fn serialized_shape_matches_registry() {
        let json = serde_json::to_value(PluginManifest::edison()).unwrap();
        assert_eq!(json["name"], "Edison Telemetry Adapter");
        assert_eq!(json["extensions"]["components"][0]["type"], "provider");
        assert_eq!(json["extensions"]["constants"][0]["priority"], "fallback");
        assert!(json["extensions"]["types"][0].get("telemetry").is_none());
        assert_eq!(
            json["extensions"]["services"][0]["depends"],
            json!(["runtime", "Edison_WS_URL"])
        );
    }

    #[test]
    fn deserializes_back() {
        let manifest = PluginManifest::edison();
        let text = serde_json::to_string(&manifest).unwrap();
        let back: PluginManifest = serde_json::from_str(&text).unwrap();
        assert_eq!(back, manifest);
    }
}
