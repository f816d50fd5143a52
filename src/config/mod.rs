// src/config/mod.rs

//! Configuration model, loading and validation.
//!
//! The engine only ever sees a validated, immutable [`ConfigFile`]; loading,
//! merging and the first-write-wins `GlobalDynamic` rule live here.

pub mod defaults;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::{default_config, write_default_config};
pub use loader::{default_config_dir, load_and_validate, load_dir, merge_sources, ConfigSource};
pub use model::{
    ConfigFile, DynamicMap, DynamicValue, GeneralSettings, OperationConfig, RawConfigFile,
    TaskConfig,
};
