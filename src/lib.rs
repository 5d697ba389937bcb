//! Pre-build injection of WiFi and MQTT connection settings into a
//! firmware build as preprocessor definitions.
//!
//! `mqtt_config.json` is read once, resolved into [`ConnectionParams`] and
//! appended to a [`ProjectEnv`], which a host adapter ([`Target`]) renders
//! for the tool that actually compiles the firmware.

pub mod config;
pub mod define;
pub mod env;
pub mod error;
pub mod host;
pub mod inject;
pub mod resolve;
pub mod settings;

pub use config::ProjectConfig;
pub use define::{stringify_macro, Define, DefineValue};
pub use env::{BuildEnv, ProjectEnv};
pub use error::InjectError;
pub use host::Target;
pub use inject::run;
pub use resolve::{resolve, ConnectionParams};
pub use settings::Settings;
