//! # edison-settings
//!
//! Configuration for the Edison telemetry feed.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`EdisonSettings::default()`]
//! 2. **User file**: `~/.edison/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `EDISON_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use edison_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("telemetry server: {}", settings.feed.ws_url);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<EdisonSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// The first call loads `~/.edison/settings.json` with env var overrides and
/// falls back to compiled defaults if loading fails.
pub fn get_settings() -> &'static EdisonSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            EdisonSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: EdisonSettings) -> std::result::Result<(), EdisonSettings> {
    SETTINGS.set(settings)
}
