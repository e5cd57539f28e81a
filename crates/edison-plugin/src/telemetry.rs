//! Historical and live telemetry for the host, routed by source.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::try_join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use edison_adapter::TelemetrySource;
use edison_core::constants::TELEMETRY_SOURCE;
use edison_core::{DataFrame, FeedError, TelemetrySeries};

/// One host request: which source and which measurement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRequest {
    /// Telemetry source key.
    pub source: String,
    /// Measurement identifier.
    pub key: String,
}

impl TelemetryRequest {
    /// A request routed to this plugin.
    pub fn edison(key: impl Into<String>) -> Self {
        Self {
            source: TELEMETRY_SOURCE.into(),
            key: key.into(),
        }
    }

    fn is_ours(&self) -> bool {
        self.source == TELEMETRY_SOURCE
    }
}

/// Source → measurement id → series.
pub type TelemetryPackage = BTreeMap<String, BTreeMap<String, TelemetrySeries>>;

/// Receives a package holding one fresh point.
pub type TelemetryCallback = Arc<dyn Fn(&TelemetryPackage) + Send + Sync>;

fn package_one(id: &str, series: TelemetrySeries) -> TelemetryPackage {
    let mut by_id = BTreeMap::new();
    let _ = by_id.insert(id.to_owned(), series);
    let mut package = TelemetryPackage::new();
    let _ = package.insert(TELEMETRY_SOURCE.to_owned(), by_id);
    package
}

#[derive(Default)]
struct Registry {
    next_token: u64,
    by_id: HashMap<String, Vec<(u64, TelemetryCallback)>>,
}

impl Registry {
    fn callbacks_for(&self, id: &str) -> Vec<TelemetryCallback> {
        self.by_id
            .get(id)
            .map(|entries| entries.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }
}

/// Serves history requests and fans live frames out per measurement.
pub struct TelemetryProvider {
    source: Arc<dyn TelemetrySource>,
    registry: Arc<Mutex<Registry>>,
}

impl TelemetryProvider {
    /// Create a provider and hook it to the source's live data.
    pub fn new(source: Arc<dyn TelemetrySource>) -> Self {
        let registry = Arc::new(Mutex::new(Registry::default()));

        let fan_out = Arc::clone(&registry);
        source.on_data(Arc::new(move |frame: &DataFrame| {
            let Some(id) = frame.id() else {
                trace!("data frame without id, not routable");
                return;
            };
            let callbacks = fan_out.lock().callbacks_for(id);
            if callbacks.is_empty() {
                trace!(id, "no callbacks for data frame");
                return;
            }
            let package = package_one(id, TelemetrySeries::from(frame));
            for callback in callbacks {
                callback(&package);
            }
        }));

        Self { source, registry }
    }

    /// Fetch history for every request routed to this plugin.
    ///
    /// Requests for other sources are ignored. Fetches run concurrently and
    /// the first failure fails the whole package.
    pub async fn request_telemetry(
        &self,
        requests: &[TelemetryRequest],
    ) -> Result<TelemetryPackage, FeedError> {
        let fetches = requests
            .iter()
            .filter(|r| r.is_ours())
            .map(|r| self.source.history(&r.key));
        let frames = try_join_all(fetches).await?;

        let mut package = TelemetryPackage::new();
        for frame in frames {
            let _ = package
                .entry(TELEMETRY_SOURCE.to_owned())
                .or_default()
                .insert(frame.id().to_owned(), TelemetrySeries::from(&*frame));
        }
        debug!(series = series_count(&package), "telemetry package ready");
        Ok(package)
    }

    /// Register `callback` for live data on every request routed to this
    /// plugin.
    ///
    /// The server is told to subscribe when a key gets its first callback.
    /// The returned handle unregisters on [`Subscription::cancel`] or drop.
    pub fn subscribe<F>(&self, callback: F, requests: &[TelemetryRequest]) -> Subscription
    where
        F: Fn(&TelemetryPackage) + Send + Sync + 'static,
    {
        let callback: TelemetryCallback = Arc::new(callback);
        let mut entries = Vec::new();

        let mut registry = self.registry.lock();
        for request in requests.iter().filter(|r| r.is_ours()) {
            let token = registry.next_token;
            registry.next_token += 1;

            let callbacks = registry.by_id.entry(request.key.clone()).or_default();
            let first = callbacks.is_empty();
            callbacks.push((token, Arc::clone(&callback)));
            if first {
                self.source.subscribe(&request.key);
            }
            entries.push((request.key.clone(), token));
        }
        drop(registry);

        Subscription {
            source: Arc::clone(&self.source),
            registry: Arc::clone(&self.registry),
            entries,
        }
    }

    /// Number of callbacks registered for `id`.
    pub fn subscriber_count(&self, id: &str) -> usize {
        self.registry.lock().by_id.get(id).map_or(0, Vec::len)
    }
}

fn series_count(package: &TelemetryPackage) -> usize {
    package.values().map(BTreeMap::len).sum()
}

/// Handle for a live subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    source: Arc<dyn TelemetrySource>,
    registry: Arc<Mutex<Registry>>,
    entries: Vec<(String, u64)>,
}

impl Subscription {
    /// Unregister now.
    pub fn cancel(self) {
        drop(self);
    }

    /// Measurement ids this handle is registered for.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    fn release(&mut self) {
        let entries = std::mem::take(&mut self.entries);
        if entries.is_empty() {
            return;
        }

        let mut registry = self.registry.lock();
        for (key, token) in entries {
            let Some(callbacks) = registry.by_id.get_mut(&key) else {
                continue;
            };
            callbacks.retain(|(t, _)| *t != token);
            if callbacks.is_empty() {
                let _ = registry.by_id.remove(&key);
                self.source.unsubscribe(&key);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
