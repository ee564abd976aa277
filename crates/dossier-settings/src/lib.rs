//! # dossier-settings
//!
//! Settings for the dossier event stream, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`DossierSettings::default()`]
//! 2. **User file**: `~/.dossier/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `DOSSIER_*` overrides (highest priority)
//!
//! Settings are loaded explicitly and handed to whatever needs them; there
//! is no global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{DEFAULT_API_BASE_URL, DossierSettings, LoggingSettings, StreamSettings};
