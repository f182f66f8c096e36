//! # vigil-settings
//!
//! Configuration types and loading for the triage engine.
//!
//! Loading order: compiled defaults, then a JSON settings file deep-merged
//! over them, then `VIGIL_*` environment overrides.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, deep_merge, load_settings_from_path};
pub use types::{
    BackendChoice, BackendSettings, CircuitSettings, PhiGuardSettings, PolicySettings,
    RequestSettings, TriageSettings,
};
