//! # edison-feed
//!
//! Command-line client for the Edison telemetry server: dump the dictionary,
//! fetch history, or watch live values.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};

use edison_adapter::{AdapterConfig, TelemetryFeedAdapter};
use edison_core::TelemetrySeries;
use edison_plugin::{
    ModelProvider, PluginManifest, TelemetryPackage, TelemetryProvider, TelemetryRequest,
};
use edison_settings::{EdisonSettings, FeedSettings};

/// Edison telemetry feed client.
#[derive(Parser, Debug)]
#[command(name = "edison-feed", about = "Edison telemetry feed client")]
struct Cli {
    /// Telemetry server URL (overrides settings).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Path to the settings file.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `edison_adapter=trace` (overrides settings).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print the measurement dictionary.
    Dictionary {
        /// Print host object models instead of the raw dictionary.
        #[arg(long)]
        taxonomy: bool,
    },
    /// Print history for one or more measurements.
    History {
        /// Measurement ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print live values until Ctrl-C.
    Watch {
        /// Measurement ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print the plugin registration record.
    Manifest,
}

/// Layer CLI flags over file and environment settings.
fn resolve_settings(cli: &Cli) -> Result<EdisonSettings> {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(edison_settings::settings_path);
    let mut settings = edison_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings: {}", path.display()))?;

    if let Some(url) = &cli.url {
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            bail!("--url must start with ws:// or wss://, got {url}");
        }
        settings.feed.ws_url.clone_from(url);
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    Ok(settings)
}

fn adapter_config(feed: &FeedSettings) -> AdapterConfig {
    AdapterConfig::new(feed.ws_url.clone())
        .with_connect_timeout(Duration::from_millis(feed.connect_timeout_ms))
}

fn series_json(series: &TelemetrySeries) -> Value {
    serde_json::to_value(series.points()).unwrap_or(Value::Null)
}

fn package_json(package: &TelemetryPackage) -> Value {
    let by_source = package
        .iter()
        .map(|(source, by_id)| {
            let by_id: Map<String, Value> = by_id
                .iter()
                .map(|(id, series)| (id.clone(), series_json(series)))
                .collect();
            (source.clone(), Value::Object(by_id))
        })
        .collect();
    Value::Object(by_source)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn dictionary(adapter: &Arc<TelemetryFeedAdapter>, taxonomy: bool) -> Result<()> {
    if taxonomy {
        let models = ModelProvider::new(adapter.clone());
        let taxonomy = models
            .taxonomy()
            .await
            .context("Failed to fetch dictionary")?;
        return print_json(&*taxonomy);
    }
    let dictionary = adapter
        .dictionary()
        .await
        .context("Failed to fetch dictionary")?;
    print_json(&*dictionary)
}

async fn history(adapter: &Arc<TelemetryFeedAdapter>, ids: &[String]) -> Result<()> {
    let telemetry = TelemetryProvider::new(adapter.clone());
    let requests: Vec<_> = ids.iter().map(TelemetryRequest::edison).collect();
    let package = telemetry
        .request_telemetry(&requests)
        .await
        .context("Failed to fetch history")?;
    print_json(&package_json(&package))
}

async fn watch(adapter: &Arc<TelemetryFeedAdapter>, ids: &[String]) -> Result<()> {
    let telemetry = TelemetryProvider::new(adapter.clone());
    let requests: Vec<_> = ids.iter().map(TelemetryRequest::edison).collect();

    let subscription = telemetry.subscribe(
        |package| {
            for by_id in package.values() {
                for (id, series) in by_id {
                    for point in series.points() {
                        println!("{}", json!({ "id": id, "value": point }));
                    }
                }
            }
        },
        &requests,
    );
    tracing::info!(ids = ?ids, "watching, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    subscription.cancel();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = resolve_settings(&cli)?;
    edison_core::logging::init_subscriber(&settings.logging.level);
    if edison_settings::init_settings(settings).is_err() {
        tracing::debug!("settings already initialized");
    }
    let settings = edison_settings::get_settings();

    if cli.command == Command::Manifest {
        let mut manifest = PluginManifest::edison();
        if let Some(constant) = manifest.extensions.constants.first_mut() {
            constant.value = Value::String(settings.feed.ws_url.clone());
        }
        return print_json(&manifest);
    }

    tracing::info!(url = %settings.feed.ws_url, "connecting to telemetry server");
    let adapter = Arc::new(TelemetryFeedAdapter::connect_with(adapter_config(
        &settings.feed,
    )));

    let outcome = match &cli.command {
        Command::Dictionary { taxonomy } => dictionary(&adapter, *taxonomy).await,
        Command::History { ids } => history(&adapter, ids).await,
        Command::Watch { ids } => watch(&adapter, ids).await,
        Command::Manifest => Ok(()),
    };

    // Providers are gone by now, so this is the last handle.
    match Arc::try_unwrap(adapter) {
        Ok(adapter) => adapter.shutdown().await,
        Err(_) => tracing::debug!("adapter still shared, dropping"),
    }
    outcome
}
