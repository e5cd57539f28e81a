//! Startup hook that wires the root board to its subsystems.

use std::sync::Arc;

use tracing::{info, warn};

use edison_adapter::TelemetrySource;
use edison_core::FeedError;
use edison_core::constants::{ROOT_ID, object_id};

/// The host's object store, as far as the initializer needs it.
pub trait ObjectService: Send + Sync {
    /// Replace the composition of object `id`. Returns `false` if the
    /// object is unknown.
    fn set_composition(&self, id: &str, composition: Vec<String>) -> bool;
}

/// Sets the root composition to the subsystem ids once the dictionary
/// arrives.
pub struct RootInitializer {
    source: Arc<dyn TelemetrySource>,
    objects: Arc<dyn ObjectService>,
}

impl RootInitializer {
    /// Create an initializer over `source` writing into `objects`.
    pub fn new(source: Arc<dyn TelemetrySource>, objects: Arc<dyn ObjectService>) -> Self {
        Self { source, objects }
    }

    /// Wait for the dictionary, then update the root. Returns the
    /// composition that was applied.
    pub async fn run(&self) -> Result<Vec<String>, FeedError> {
        let dictionary = self.source.dictionary().await?;
        let composition: Vec<String> = dictionary
            .subsystems
            .iter()
            .map(|s| object_id(&s.identifier))
            .filter(|id| id != ROOT_ID)
            .collect();

        if self.objects.set_composition(ROOT_ID, composition.clone()) {
            info!(subsystems = composition.len(), "root composition set");
        } else {
            warn!(id = ROOT_ID, "root object missing, composition not applied");
        }
        Ok(composition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSource;
    use assert_matches::assert_matches;
    use edison_core::logging::capture_logs;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use tracing::Level;

    #[derive(Default)]
    struct Objects {
        compositions: Mutex<HashMap<String, Vec<String>>>,
    }

    impl Objects {
        fn with_root() -> Arc<Self> {
            let objects = Self::default();
            let _ = objects
                .compositions
                .lock()
                .insert(ROOT_ID.to_owned(), Vec::new());
            Arc::new(objects)
        }
    }

    impl ObjectService for Objects {
        fn set_composition(&self, id: &str, composition: Vec<String>) -> bool {
            match self.compositions.lock().get_mut(id) {
                Some(slot) => {
                    *slot = composition;
                    true
                }
                None => false,
            }
        }
    }

    #[tokio::test]
    async fn sets_root_to_subsystems() {
        let objects = Objects::with_root();
        let init = RootInitializer::new(FakeSource::new(), objects.clone());

        let applied = init.run().await.unwrap();
        assert_eq!(applied, vec!["Edison:pwr", "Edison:sys"]);
        assert_eq!(objects.compositions.lock()[ROOT_ID], applied);
    }

    #[tokio::test]
    async fn missing_root_is_logged() {
        let (logs, _guard) = capture_logs();
        let init = RootInitializer::new(FakeSource::new(), Arc::new(Objects::default()));

        let applied = init.run().await.unwrap();
        assert_eq!(applied.len(), 2);
        assert!(logs.has_event(Level::WARN, "root object missing"));
    }

    #[tokio::test]
    async fn dictionary_failure_leaves_root_untouched() {
        let objects = Objects::with_root();
        let source = FakeSource::with_dictionary(Err(FeedError::Transport("reset".into())));
        let init = RootInitializer::new(source, objects.clone());

        assert_matches!(init.run().await, Err(FeedError::Transport(_)));
        assert!(objects.compositions.lock()[ROOT_ID].is_empty());
    }
}
