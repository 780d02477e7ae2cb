//! Data models for the Seg3D core.
//!
//! - [`Settings`]: application settings loaded from `Seg3D Settings.yaml`
//!   by [`ConfigManager`](crate::config::ConfigManager)

pub mod settings;

pub use settings::Settings;
