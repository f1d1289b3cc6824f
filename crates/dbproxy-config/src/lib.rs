//! Layered YAML configuration loading: merge, canonicalize, hash, then
//! deserialize into the typed document described in the configuration
//! reference.

mod config;
mod merge;

pub use config::{ConfigError, DatabaseSpec, HealthConfig, ProxyConfig};
pub use merge::{load_layered_yaml, LoadedConfig};
