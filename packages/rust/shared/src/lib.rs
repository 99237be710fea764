//! Shared types, error model, and configuration for hazfill.
//!
//! This crate is the foundation depended on by all other hazfill crates.
//! It provides:
//! - [`HazfillError`]: the unified error type
//! - The HMIS schema ([`FieldDescriptor`], [`FIELDS`]) and [`Record`] model
//! - Configuration ([`AppConfig`], [`FillConfig`], config loading)

pub mod config;
pub mod error;
pub mod record;
pub mod schema;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FillConfig, LlmConfig, SearchConfig, TiersConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{HazfillError, Result};
pub use record::Record;
pub use schema::{FIELD_COUNT, FIELDS, FieldDescriptor};
