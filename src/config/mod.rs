//! Configuration loading
//!
//! Handles loading from config files and environment variables with precedence
//! Env > File > Defaults.

pub mod loader;
pub mod settings;

pub use loader::{apply_env_overrides, load_config};
pub use settings::{Config, DocumentBackendConfig, VisionBackendConfig};
