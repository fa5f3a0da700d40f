//! Environment-driven configuration for trackdash.
//!
//! Settings are an explicit value threaded into component constructors —
//! there is no ambient global state. [`SettingsLoader`] reads the
//! `TRACKDASH_*` environment at startup and validates everything once.

mod loader;
mod settings;

pub use loader::SettingsLoader;
pub use settings::Settings;
